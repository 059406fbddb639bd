//! Shell command building utilities.

use std::path::PathBuf;

/// Escape a string for use in a shell command.
pub fn shell_escape(s: &str) -> String {
    // Use single quotes and escape any single quotes within
    let escaped = s.replace('\'', "'\"'\"'");
    format!("'{}'", escaped)
}

/// Locate an executable on `PATH`. Names containing a slash are checked as given.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    which::which(program).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_plain_and_quoted() {
        assert_eq!(shell_escape("logs/claude.log"), "'logs/claude.log'");
        assert_eq!(shell_escape("it's"), "'it'\"'\"'s'");
        assert_eq!(shell_escape("a b;rm -rf /"), "'a b;rm -rf /'");
    }

    #[test]
    fn finds_sh_on_path() {
        let sh = find_in_path("sh").expect("sh should be on PATH");
        assert!(sh.is_absolute());
        assert!(find_in_path("definitely-not-a-real-program-5d1c").is_none());
    }

    #[test]
    fn explicit_paths_are_checked_directly() {
        assert!(find_in_path("/bin/sh").is_some());
        assert!(find_in_path("/nonexistent/sh").is_none());
    }

    #[test]
    fn files_without_the_exec_bit_are_not_programs() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bot.sh");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(find_in_path(script.to_str().unwrap()).is_none());

        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(find_in_path(script.to_str().unwrap()), Some(script));
    }
}
