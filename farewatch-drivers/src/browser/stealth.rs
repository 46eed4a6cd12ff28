use crate::browser::fingerprint::UserAgentProfile;
use crate::browser::session::PageScript;
use farewatch_common::StealthProfile;

/// Construct Chrome command‑line arguments for a given stealth profile
/// and fingerprint.
pub fn build_stealth_arguments(
    profile: StealthProfile,
    user_profile: &UserAgentProfile,
    headless: bool,
) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--disable-plugins-discovery".to_string(),
        format!("--user-agent={}", user_profile.user_agent),
        format!(
            "--window-size={},{}",
            user_profile.viewport.0, user_profile.viewport.1
        ),
        format!("--lang={}", user_profile.languages.join(",")),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    if headless || profile == StealthProfile::Maximum {
        args.push("--disable-gpu".to_string());
    }
    args
}

/// Evasion scripts to run after each navigation, in order.
pub fn evasions_for(profile: StealthProfile) -> &'static [PageScript] {
    match profile {
        StealthProfile::Lightweight => &[CORE_EVASIONS],
        StealthProfile::Balanced => &[CORE_EVASIONS, CANVAS_EVASIONS],
        StealthProfile::Maximum => &[CORE_EVASIONS, CANVAS_EVASIONS, WEBGL_EVASIONS],
    }
}

/// Overrides `navigator.platform`; takes the platform string as argument 0.
pub const PLATFORM_OVERRIDE: PageScript = PageScript::new(
    "stealth_platform",
    r#"
        const platform = arguments[0];
        Object.defineProperty(navigator, 'platform', { get: () => platform });
    "#,
);

pub const CORE_EVASIONS: PageScript = PageScript::new(
    "stealth_core",
    r#"
        Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
        Object.defineProperty(navigator, 'plugins', { get: () => [1,2,3] });
        Object.defineProperty(navigator, 'languages', {
            get: () => ['vi-VN', 'vi', 'en-US']
        });
        if (!window.chrome) window.chrome = { runtime: {} };
    "#,
);

pub const WEBGL_EVASIONS: PageScript = PageScript::new(
    "stealth_webgl",
    r#"
        const getParameter = WebGLRenderingContext.prototype.getParameter;
        WebGLRenderingContext.prototype.getParameter = function(parameter) {
            if (parameter === 37445) return 'Intel Inc.';
            if (parameter === 37446) return 'Intel Iris OpenGL Engine';
            return getParameter.call(this, parameter);
        };
    "#,
);

pub const CANVAS_EVASIONS: PageScript = PageScript::new(
    "stealth_canvas",
    r#"
        const getContext = HTMLCanvasElement.prototype.getContext;
        HTMLCanvasElement.prototype.getContext = function(type,...args){
            const ctx = getContext.call(this,type,...args);
            if(type==='2d' && ctx) {
                const origToDataURL=this.toDataURL;
                this.toDataURL=function(...a){
                    const imgdata=ctx.getImageData(0,0,this.width,this.height);
                    for(let i=0;i<imgdata.data.length;i+=4){
                        if(Math.random()<0.001)imgdata.data[i]+=Math.random()<0.5?-1:1;
                    }
                    ctx.putImageData(imgdata,0,0);
                    return origToDataURL.call(this,...a);
                };
            }
            return ctx;
        };
    "#,
);
