pub mod base62;
pub mod idgen;

pub use idgen::{RandomSource, ThreadRandom, generate_code};

/// 拼接完整短链接，缺省协议时补 `http://`
pub fn resolve_url(base_url: &str, code: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.contains("//") {
        format!("{}/{}", base, code)
    } else {
        format!("http://{}/{}", base, code)
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_url;

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("http://base", "abc"), "http://base/abc");
        assert_eq!(resolve_url("localhost:8080", "abc"), "http://localhost:8080/abc");
        assert_eq!(resolve_url("https://s.io/", "x"), "https://s.io/x");
    }
}
