use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "check_readonlyfs", version, about = "Check for readonly filesystems")]
pub struct Cli {
    /// Limit listing to local file systems
    #[arg(short = 'l', long)]
    pub local: bool,

    /// Display the list of checked file systems
    #[arg(short = 'L', long)]
    pub list: bool,

    /// Limit listing to file systems of type TYPE
    #[arg(short = 'T', long = "type", value_name = "TYPE")]
    pub types: Vec<String>,

    /// Limit listing to file systems not of type TYPE
    #[arg(short = 'X', long = "exclude-type", value_name = "TYPE")]
    pub exclude_types: Vec<String>,

    /// Mount points to check instead of every mounted file system
    #[arg(value_name = "FILESYSTEM")]
    pub filesystems: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_repeated_type_filters() {
        let cli = Cli::try_parse_from([
            "check_readonlyfs",
            "-l",
            "-T",
            "ext4",
            "--type=xfs",
            "-X",
            "tmpfs",
            "/",
            "/data",
        ])
        .unwrap();
        assert!(cli.local);
        assert!(!cli.list);
        assert_eq!(cli.types, vec!["ext4", "xfs"]);
        assert_eq!(cli.exclude_types, vec!["tmpfs"]);
        assert_eq!(cli.filesystems, vec!["/", "/data"]);
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["check_readonlyfs", "--bogus"]).is_err());
    }
}
