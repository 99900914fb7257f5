use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Same reserved set as a URI component: everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

pub fn track_search_url(api_base: &str, query: &str, limit: u32) -> String {
    let encoded = encode_component(query.trim());
    format!(
        "{}/search?q={encoded}&type=track&limit={limit}",
        api_base.trim_end_matches('/')
    )
}

pub fn new_releases_url(api_base: &str, limit: u32) -> String {
    format!(
        "{}/browse/new-releases?limit={limit}",
        api_base.trim_end_matches('/')
    )
}

pub fn generate_content_url(api_base: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        api_base.trim_end_matches('/'),
        encode_component(model)
    )
}

#[cfg(test)]
mod tests {
    use super::{generate_content_url, new_releases_url, track_search_url};

    #[test]
    fn search_url_trims_and_encodes_query() {
        let url = track_search_url("https://api.spotify.com/v1/", "  AC/DC Back In Black ", 20);
        assert_eq!(
            url,
            "https://api.spotify.com/v1/search?q=AC%2FDC%20Back%20In%20Black&type=track&limit=20"
        );
    }

    #[test]
    fn search_url_keeps_unreserved_marks() {
        let url = track_search_url("http://localhost", "don't (stop)", 5);
        assert!(url.contains("q=don't%20(stop)&"));
    }

    #[test]
    fn releases_and_model_urls() {
        assert_eq!(
            new_releases_url("https://api.spotify.com/v1", 12),
            "https://api.spotify.com/v1/browse/new-releases?limit=12"
        );
        assert_eq!(
            generate_content_url("https://example.com/v1beta", "gemini-3-flash-preview"),
            "https://example.com/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }
}
