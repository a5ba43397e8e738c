//! Command scope enforcement
//!
//! A capability token carries the commands its approval covers. The
//! gateway refuses anything outside that list and anything that tries
//! to smuggle a second command through shell metacharacters.

use wingman_types::DeploymentEnv;

/// Shell sequences that would escape the approved command. Checked as
/// plain substrings after the scope match.
pub const FORBIDDEN_SEQUENCES: &[&str] = &[
    ";", "&&", "||", "|", "`", "$(", ")", ">", "<", "\n", "\r",
];

/// Returns the first forbidden sequence found in `command`, if any.
pub fn forbidden_sequence(command: &str) -> Option<&'static str> {
    FORBIDDEN_SEQUENCES
        .iter()
        .find(|seq| command.contains(**seq))
        .copied()
}

/// Whether `command` is covered by a scope entry. An entry matches
/// exactly or as a word prefix: entry "docker compose" covers
/// "docker compose ps" but not "docker composexyz".
fn scope_covers(allowed: &[String], command: &str) -> bool {
    allowed.iter().any(|entry| {
        let entry = entry.trim();
        !entry.is_empty()
            && (command == entry || command.starts_with(&format!("{entry} ")))
    })
}

/// Validates a command against the token scope.
///
/// An empty scope means the approval did not restrict commands; that is
/// accepted everywhere except prd, where an unrestricted token is
/// refused outright. Scope membership is checked before metacharacters
/// so a command that was never approved reports the scope miss, not the
/// injection attempt it may also contain.
pub fn validate_scope(
    allowed: &[String],
    command: &str,
    environment: DeploymentEnv,
) -> Result<(), String> {
    let command = command.trim();
    if command.is_empty() {
        return Err("command is empty".to_string());
    }

    if allowed.is_empty() {
        if environment == DeploymentEnv::Prd {
            return Err("unrestricted token is not permitted in prd".to_string());
        }
    } else if !scope_covers(allowed, command) {
        return Err("command not in approved scope".to_string());
    }

    if let Some(seq) = forbidden_sequence(command) {
        return Err(format!("command contains forbidden sequence {seq:?}"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_is_covered() {
        assert!(validate_scope(&scope(&["docker compose ps"]), "docker compose ps", DeploymentEnv::Prd).is_ok());
    }

    #[test]
    fn word_prefix_extends_an_entry() {
        let allowed = scope(&["kubectl get"]);
        assert!(validate_scope(&allowed, "kubectl get pods", DeploymentEnv::Test).is_ok());
        assert!(validate_scope(&allowed, "kubectl getpods", DeploymentEnv::Test).is_err());
    }

    #[test]
    fn out_of_scope_command_reports_scope_miss() {
        let err = validate_scope(
            &scope(&["docker compose ps"]),
            "docker compose ps; rm -rf /",
            DeploymentEnv::Prd,
        )
        .unwrap_err();
        assert!(err.contains("not in approved scope"), "got: {err}");
    }

    #[test]
    fn metacharacters_are_refused_even_in_scope() {
        let err = validate_scope(
            &scope(&["echo"]),
            "echo hi && rm -rf /",
            DeploymentEnv::Dev,
        )
        .unwrap_err();
        assert!(err.contains("forbidden sequence"), "got: {err}");
    }

    #[test]
    fn empty_scope_is_open_outside_prd() {
        assert!(validate_scope(&[], "ls -la", DeploymentEnv::Dev).is_ok());
        assert!(validate_scope(&[], "ls -la", DeploymentEnv::Prd).is_err());
    }

    #[test]
    fn empty_command_is_refused() {
        assert!(validate_scope(&scope(&["ls"]), "   ", DeploymentEnv::Dev).is_err());
    }

    #[test]
    fn forbidden_sequence_finds_first_hit() {
        assert_eq!(forbidden_sequence("a; b"), Some(";"));
        assert_eq!(forbidden_sequence("a $(b)"), Some("$("));
        assert_eq!(forbidden_sequence("plain command"), None);
    }
}
