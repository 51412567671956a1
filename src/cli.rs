// src/cli.rs

use clap::Parser;

/// Converts an identifier-suffixed Markdown export into a cleaned note vault.
///
/// vaultport walks an exported page tree, strips the hexadecimal identifier
/// tokens the export appends to every file and directory name, rewrites
/// inter-document links into wiki-style references, merges pages into their
/// attachment folders, and resolves the name collisions that cleaning can
/// introduce. A dry run previews the whole plan without touching the tree.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the export root to convert.
    pub input_path: String,

    /// Relocate the converted tree to this path after all stages complete.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output_path: Option<String>,

    /// Preview the run (plan, estimated rewrites, report) without mutating
    /// the filesystem.
    #[arg(short = 'D', long, action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Skip the confirmation prompt before mutation (for scripted runs).
    #[arg(short = 'y', long = "yes", action = clap::ArgAction::SetTrue)]
    pub assume_yes: bool,

    /// Extension of exported documents.
    #[arg(long = "ext", value_name = "EXT", default_value = "md")]
    pub doc_extension: String,

    /// Documents rewritten per parallel batch.
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Keep pre-existing numeric collision suffixes (-1, -2, ...) from the
    /// source export instead of stripping them when they match the parent
    /// folder name.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub keep_counter_suffix: bool,

    /// Skip entries matching these glob patterns (relative to the export
    /// root, repeatable).
    #[arg(short = 'i', long = "ignore", value_name = "GLOB", num_args = 1..)]
    pub ignore_patterns: Option<Vec<String>>,

    /// Override the identifier token pattern (a regex matched against the
    /// whole token).
    #[arg(long, value_name = "REGEX")]
    pub identifier_pattern: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let cli = Cli::parse_from(["vaultport", "export"]);
        assert_eq!(cli.input_path, "export");
        assert!(!cli.dry_run);
        assert!(!cli.assume_yes);
        assert_eq!(cli.doc_extension, "md");
    }

    #[test]
    fn test_flags_parse() {
        let cli = Cli::parse_from([
            "vaultport",
            "export",
            "-D",
            "-y",
            "-o",
            "vault",
            "--batch-size",
            "8",
            "--keep-counter-suffix",
            "-i",
            "*.bak",
            "junk/**",
        ]);
        assert!(cli.dry_run);
        assert!(cli.assume_yes);
        assert_eq!(cli.output_path.as_deref(), Some("vault"));
        assert_eq!(cli.batch_size, Some(8));
        assert!(cli.keep_counter_suffix);
        assert_eq!(cli.ignore_patterns.as_ref().unwrap().len(), 2);
    }
}
