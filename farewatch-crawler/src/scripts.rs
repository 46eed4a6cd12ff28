//! In-page scripts used by the crawl engine.
//!
//! Scripts that locate something by heuristic tag the element with a unique
//! `data-fw-mark` attribute and return a selector for it, so every later
//! interaction goes through the ordinary selector-based click path.

use farewatch_drivers::PageScript;

macro_rules! page_script {
    ($name:literal, $body:literal) => {
        PageScript::new(
            $name,
            concat!(
                r#"
const fwVisible = (el) => {
    if (!el || !el.isConnected) return false;
    const rect = el.getBoundingClientRect();
    if (rect.width === 0 || rect.height === 0) return false;
    for (let node = el; node; node = node.parentElement) {
        const style = window.getComputedStyle(node);
        if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
    }
    return true;
};
const fwText = (el) => (el ? (el.innerText || el.textContent || '') : '').replace(/\s+/g, ' ').trim();
const fwMark = (el, kind) => {
    window.__fwSeq = (window.__fwSeq || 0) + 1;
    const token = kind + '-' + window.__fwSeq;
    el.setAttribute('data-fw-mark', token);
    return '[data-fw-mark="' + token + '"]';
};
const fwActivate = (el) => {
    if (typeof el.click === 'function') { el.click(); return; }
    el.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window }));
};
const fwFindByText = (scope, candidates, needles) => {
    const roots = scope ? Array.from(document.querySelectorAll(scope)) : [document];
    const wanted = needles.map((n) => String(n).toLowerCase()).filter((n) => n.length > 0);
    for (const root of roots) {
        for (const el of root.querySelectorAll(candidates)) {
            if (!fwVisible(el)) continue;
            const text = fwText(el).toLowerCase();
            if (wanted.some((n) => text.includes(n))) return el;
        }
    }
    return null;
};
const fwHasIcon = (el, signature) =>
    Array.from(el.querySelectorAll('svg path')).some((p) => (p.getAttribute('d') || '').startsWith(signature));
"#,
                $body
            ),
        )
    };
}

/// `[selector]` -> `{exists, visible, in_viewport}`
pub const ELEMENT_STATE: PageScript = page_script!(
    "element_state",
    r#"
const el = document.querySelector(arguments[0]);
if (!el) return { exists: false, visible: false, in_viewport: false };
const rect = el.getBoundingClientRect();
const inViewport = rect.bottom > 0 && rect.right > 0
    && rect.top < window.innerHeight && rect.left < window.innerWidth;
return { exists: true, visible: fwVisible(el), in_viewport: inViewport };
"#
);

/// `[selector]` -> bool; activation that ignores occluding overlays.
pub const FORCE_CLICK: PageScript = page_script!(
    "force_click",
    r#"
const el = document.querySelector(arguments[0]);
if (!el) return false;
fwActivate(el);
return true;
"#
);

/// `[selector, marker_selector]` -> bool
pub const CLICK_INNER_MARKER: PageScript = page_script!(
    "click_inner_marker",
    r#"
const el = document.querySelector(arguments[0]);
const inner = el ? el.querySelector(arguments[1]) : null;
if (!inner) return false;
fwActivate(inner);
return true;
"#
);

/// `[selector]` -> bool
pub const HOVER_THEN_CLICK: PageScript = page_script!(
    "hover_then_click",
    r#"
const el = document.querySelector(arguments[0]);
if (!el) return false;
const opts = { bubbles: true, cancelable: true, view: window };
for (const type of ['pointerover', 'pointerenter', 'mouseover', 'mouseenter', 'mousemove']) {
    el.dispatchEvent(new MouseEvent(type, opts));
}
el.dispatchEvent(new MouseEvent('mousedown', opts));
el.dispatchEvent(new MouseEvent('mouseup', opts));
fwActivate(el);
return true;
"#
);

/// `[selector]` -> bool; lets reactive inputs recompute derived state.
pub const DISPATCH_INPUT_EVENTS: PageScript = page_script!(
    "dispatch_input_events",
    r#"
const el = document.querySelector(arguments[0]);
if (!el) return false;
el.dispatchEvent(new Event('input', { bubbles: true }));
el.dispatchEvent(new Event('change', { bubbles: true }));
el.dispatchEvent(new KeyboardEvent('keyup', { bubbles: true }));
return true;
"#
);

/// `[scope, candidates, labels]` -> selector | null
pub const MARK_TRIP_TYPE: PageScript = page_script!(
    "mark_trip_type",
    r#"
const el = fwFindByText(arguments[0], arguments[1], arguments[2]);
return el ? fwMark(el, 'trip') : null;
"#
);

/// `[panel, entries, needles]` -> selector | null; first entry in document
/// order containing any needle.
pub const MARK_AIRPORT_CANDIDATE: PageScript = page_script!(
    "mark_airport_candidate",
    r#"
const el = fwFindByText(arguments[0], arguments[1], arguments[2]);
return el ? fwMark(el, 'airport') : null;
"#
);

/// `[scope, candidates, labels]` -> selector | null
pub const MARK_COOKIE_ACCEPT: PageScript = page_script!(
    "mark_cookie_accept",
    r#"
const el = fwFindByText(arguments[0], arguments[1], arguments[2]);
return el ? fwMark(el, 'cookie') : null;
"#
);

/// `[scope, candidates, labels]` -> selector | null
pub const MARK_CHEAPEST_TOGGLE: PageScript = page_script!(
    "mark_cheapest_toggle",
    r#"
const el = fwFindByText(arguments[0], arguments[1], arguments[2]);
return el ? fwMark(el, 'cheapest') : null;
"#
);

/// `[scope, candidates, labels]` -> selector | null
pub const MARK_SEARCH_BUTTON: PageScript = page_script!(
    "mark_search_button",
    r#"
const el = fwFindByText(arguments[0], arguments[1], arguments[2]);
return el ? fwMark(el, 'search') : null;
"#
);

/// `[header_selector]` -> text | null
pub const READ_MONTH_HEADER: PageScript = page_script!(
    "read_month_header",
    r#"
const el = Array.from(document.querySelectorAll(arguments[0])).find(fwVisible);
return el ? fwText(el) : null;
"#
);

/// `[cell, number, day, passive_class, disabled_class]` -> `{strict, loose}`
///
/// `strict` is a label-matching cell that is selectable: not an overflow day
/// of a neighbouring month, not disabled, and reachable by keyboard.
pub const MARK_DAY_CELLS: PageScript = page_script!(
    "mark_day_cells",
    r#"
const [cellSel, numberSel, day, passive, disabled] = arguments;
let loose = null;
for (const cell of document.querySelectorAll(cellSel)) {
    const label = cell.querySelector(numberSel) || cell;
    if (parseInt(fwText(label), 10) !== day) continue;
    if (!loose) loose = cell;
    const selectable = !cell.classList.contains(passive)
        && !cell.classList.contains(disabled)
        && !cell.disabled
        && cell.getAttribute('aria-disabled') !== 'true'
        && cell.tabIndex >= 0;
    if (selectable && fwVisible(cell)) return { strict: fwMark(cell, 'day'), loose: null };
}
return { strict: null, loose: loose ? fwMark(loose, 'day') : null };
"#
);

/// `[currency]` -> number of rendered currency labels.
pub const COUNT_PRICE_INDICATORS: PageScript = page_script!(
    "count_price_indicators",
    r#"
const currency = String(arguments[0]).toLowerCase();
let n = 0;
for (const el of document.querySelectorAll('body *')) {
    if (el.children.length === 0 && fwText(el).toLowerCase() === currency && fwVisible(el)) n++;
}
return n;
"#
);

/// `[currency]` -> `[{selector, price_text}]` in document order.
///
/// A fare row is a container whose first two children are an amount and the
/// currency label, wrapped one level below a parent whose adjacent sibling
/// carries an icon (the dropdown indicator).
pub const MARK_PRICE_OPTIONS: PageScript = page_script!(
    "mark_price_options",
    r#"
const currency = String(arguments[0]).toLowerCase();
const amount = /^[\d.,\s]+$/;
const seen = new Set();
const out = [];
for (const el of document.querySelectorAll('body *')) {
    const kids = el.children;
    if (kids.length < 2) continue;
    if (!amount.test(fwText(kids[0])) || fwText(kids[1]).toLowerCase() !== currency) continue;
    const wrapper = el.parentElement;
    if (!wrapper || seen.has(wrapper) || !fwVisible(wrapper)) continue;
    const marker = [wrapper.previousElementSibling, wrapper.nextElementSibling].some((sib) =>
        sib && (sib.tagName.toLowerCase() === 'svg' || sib.querySelector('svg')));
    if (!marker) continue;
    seen.add(wrapper);
    out.push({ selector: fwMark(wrapper, 'option'), price_text: fwText(kids[0]) + ' ' + fwText(kids[1]) });
}
return out;
"#
);

/// `[panel_selector]` -> `{text, rows: [{label, value}]}` | null
pub const READ_BOOKING_PANEL: PageScript = page_script!(
    "read_booking_panel",
    r#"
const panel = Array.from(document.querySelectorAll(arguments[0])).find(fwVisible);
if (!panel) return null;
const rows = [];
for (const el of panel.querySelectorAll('*')) {
    if (el.children.length !== 2) continue;
    const label = fwText(el.children[0]);
    const value = fwText(el.children[1]);
    if (label && value && label.length <= 80) rows.push({ label, value });
}
return { text: fwText(panel), rows };
"#
);

/// `[icon_buttons, signature]` -> selector | null
pub const MARK_NEXT_DAY_ICON: PageScript = page_script!(
    "mark_next_day_icon",
    r#"
for (const btn of document.querySelectorAll(arguments[0])) {
    if (btn.disabled || !fwVisible(btn)) continue;
    if (fwHasIcon(btn, arguments[1])) return fwMark(btn, 'next-day');
}
return null;
"#
);

/// `[strip, signature]` -> selector | null; a clickable with the next icon
/// level with the date strip and at or past its right edge.
pub const MARK_NEXT_DAY_NEAR_STRIP: PageScript = page_script!(
    "mark_next_day_near_strip",
    r#"
const strip = Array.from(document.querySelectorAll(arguments[0])).find(fwVisible);
if (!strip) return null;
const box = strip.getBoundingClientRect();
for (const el of document.querySelectorAll('button, [role="button"], div, span')) {
    if (!fwVisible(el) || !fwHasIcon(el, arguments[1])) continue;
    const r = el.getBoundingClientRect();
    const level = r.bottom >= box.top - 40 && r.top <= box.bottom + 40;
    if (level && r.left >= box.right - 80) return fwMark(el, 'next-day');
}
return null;
"#
);

/// `[slider]` -> selector | null; the control right after the date slider,
/// else the last button in its parent.
pub const MARK_NEXT_DAY_SLIDER: PageScript = page_script!(
    "mark_next_day_slider",
    r#"
const slider = Array.from(document.querySelectorAll(arguments[0])).find(fwVisible);
if (!slider) return null;
const siblings = slider.parentElement
    ? Array.from(slider.parentElement.querySelectorAll('button, [role="button"]')).reverse()
    : [];
for (const c of [slider.nextElementSibling, ...siblings]) {
    if (!c || !fwVisible(c)) continue;
    if (c.tagName === 'BUTTON' || c.getAttribute('role') === 'button' || c.querySelector('svg')) {
        return fwMark(c, 'next-day');
    }
}
return null;
"#
);
