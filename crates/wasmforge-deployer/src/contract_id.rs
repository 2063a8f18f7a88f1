//! Contract identifier extraction from deploy CLI output (spec §4.7 step
//! 7). Four heuristics tried in order, first match wins. Pure and
//! unit-testable without spawning a process.

use regex::Regex;

/// A contract identifier: ASCII, begins with `C`, base32-uppercase, length
/// greater than 50 (spec §6).
fn looks_like_contract_id(candidate: &str) -> bool {
    candidate.starts_with('C')
        && candidate.len() > 50
        && candidate
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c))
}

/// Extract a contract id from deploy CLI stdout, trying each heuristic
/// below in order; first match wins.
pub fn extract_contract_id(output: &str) -> Option<String> {
    whole_line_token(output)
        .or_else(|| labeled_line(output))
        .or_else(|| id_colon_regex(output))
        .or_else(|| json_id_regex(output))
}

/// Heuristic 1: a whole line beginning with `C` and length > 50.
fn whole_line_token(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| looks_like_contract_id(line))
        .map(str::to_string)
}

/// Heuristic 2: a line containing `Contract ID:` followed by a `C…` token.
fn labeled_line(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(idx) = line.find("Contract ID:") {
            let rest = &line[idx + "Contract ID:".len()..];
            if let Some(token) = rest.split_whitespace().next() {
                if token.starts_with('C') && token.len() > 10 {
                    return Some(token.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_string());
                }
            }
        }
    }
    None
}

/// Heuristic 3: a regex `id:\s*(C[A-Z0-9]+)`.
fn id_colon_regex(output: &str) -> Option<String> {
    let re = Regex::new(r"id:\s*(C[A-Z0-9]+)").ok()?;
    re.captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Heuristic 4: a JSON-ish regex `"id"\s*:\s*"(C[A-Z0-9]+)"`.
fn json_id_regex(output: &str) -> Option<String> {
    let re = Regex::new(r#""id"\s*:\s*"(C[A-Z0-9]+)""#).ok()?;
    re.captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// A 64-character lowercase hex wasm hash, as returned by `UploadWasm`
/// (spec §4.7 auxiliary operations).
pub fn extract_wasm_hash(output: &str) -> Option<String> {
    let re = Regex::new(r"[0-9a-f]{64}").ok()?;
    re.find(output).map(|m| m.as_str().to_string())
}

pub fn is_valid_wasm_hash(candidate: &str) -> bool {
    candidate.len() == 64 && candidate.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_id(prefix_len: usize) -> String {
        format!("C{}", "A".repeat(prefix_len))
    }

    #[test]
    fn extracts_whole_line_token() {
        let out = format!("deploying...\n{}\ndone", long_id(55));
        assert_eq!(extract_contract_id(&out), Some(long_id(55)));
    }

    #[test]
    fn extracts_labeled_contract_id() {
        let out = "Deploy successful\nContract ID: CABCDEF1234567890ABCDEF\nother text";
        assert_eq!(
            extract_contract_id(out),
            Some("CABCDEF1234567890ABCDEF".to_string())
        );
    }

    #[test]
    fn extracts_id_colon_form() {
        let out = "result { id: CXYZ123ABC }";
        assert_eq!(extract_contract_id(out), Some("CXYZ123ABC".to_string()));
    }

    #[test]
    fn extracts_json_id_form() {
        let out = r#"{"status":"ok","id":"CJSON9988"}"#;
        assert_eq!(extract_contract_id(out), Some("CJSON9988".to_string()));
    }

    #[test]
    fn returns_none_when_absent() {
        assert_eq!(extract_contract_id("no identifiers here"), None);
    }

    #[test]
    fn whole_line_token_rejects_non_base32_characters() {
        // Starts with 'C', longer than 50 chars, but contains lowercase and
        // digits outside the RFC4648 base32 alphabet (0/1/8/9) — should not
        // be mistaken for heuristic 1's contract-id shape.
        let banner = format!("Compiling contract at /home/user/project/target/{}", "x".repeat(60));
        assert!(banner.starts_with('C'));
        assert_eq!(extract_contract_id(&banner), None);
    }

    #[test]
    fn first_match_wins_whole_line_over_labeled() {
        let out = format!("Contract ID: CSHORT\n{}", long_id(55));
        assert_eq!(extract_contract_id(&out), Some(long_id(55)));
    }

    #[test]
    fn extracts_wasm_hash() {
        let hash = "a".repeat(64);
        let out = format!("wasm hash: {hash}");
        assert_eq!(extract_wasm_hash(&out), Some(hash.clone()));
        assert!(is_valid_wasm_hash(&hash));
    }

    #[test]
    fn rejects_short_hash() {
        assert!(!is_valid_wasm_hash("abc123"));
    }
}
