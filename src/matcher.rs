use std::borrow::Cow;

/// Keywords from `keywords` that occur in `text`, case-insensitively.
///
/// Results keep the order (and original spelling) of `keywords`. Keywords
/// are compared exactly as written, surrounding spaces included, so `" art "`
/// only matches the standalone word. A keyword listed twice is reported twice.
pub fn find_matches(text: &str, keywords: &[String]) -> Vec<String> {
    // Page text normally arrives lowercased from the fetcher.
    let haystack: Cow<'_, str> = if text.chars().any(char::is_uppercase) {
        Cow::Owned(text.to_lowercase())
    } else {
        Cow::Borrowed(text)
    };

    keywords
        .iter()
        .filter(|keyword| haystack.contains(keyword.to_lowercase().as_str()))
        .cloned()
        .collect()
}
