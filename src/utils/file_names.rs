//! File-system names derived from job ids

/// Encode a job id as a single path component.
///
/// ASCII letters, digits, `-` and `_` pass through; every other byte becomes
/// `%XX`. The mapping is injective, so two ids never share a file, and the
/// result can never be `.`, `..` or contain a separator.
pub fn job_file_stem(job_id: &str) -> String {
    let mut stem = String::with_capacity(job_id.len());
    for byte in job_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    if stem.is_empty() {
        // empty id still needs a name
        stem.push('%');
    }
    stem
}
