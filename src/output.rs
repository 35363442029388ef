use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `SHOWMYSLSKD_QUIET=1` suppresses progress bars
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("SHOWMYSLSKD_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
