use std::collections::BTreeMap;

/// Query parameters of one request. Sorted, so equal queries hash equally.
pub type Params = BTreeMap<String, String>;

pub fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

pub(crate) fn endpoint_url(base: &str, endpoint: &str, method: &str) -> String {
    urljoin(base, &format!("{}/{}", endpoint, method))
}

/// The job name GENESIS announces in a "job accepted" status, e.g.
/// `"... unter folgendem Namen abgerufen werden: 12411BJ001_123456789"`.
pub(crate) fn parse_job_id(content: &str) -> Option<String> {
    let (_, id) = content.rsplit_once(':')?;
    let id = id.trim();
    if id.is_empty() { None } else { Some(id.to_string()) }
}

pub(crate) fn is_completion_state(state: &str) -> bool {
    let state = state.trim();
    ["Fertig", "finished"]
        .iter()
        .any(|m| m.eq_ignore_ascii_case(state))
}
