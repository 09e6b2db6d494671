//! Tests for the shared command-line driver and argument helpers

#[cfg(test)]
mod tests {
    use clap::Parser;
    use neurovol::ToolError;
    use neurovol::io::cli::{
        OutputTypeArgs, ToolCommand, ensure_input_exists, ensure_output_writable, execute,
        normalize_legacy_flags, resolve_input, with_default_suffix,
    };
    use neurovol::io::volume::OutputType;
    use std::cell::Cell;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};
    use std::process::ExitCode;
    use tempfile::TempDir;

    #[derive(Parser, Debug)]
    #[command(name = "sample_tool")]
    struct SampleCli {
        #[arg(long)]
        verbose: bool,
        #[arg(long)]
        clobber: bool,
        #[command(flatten)]
        output_type: OutputTypeArgs,
        input: PathBuf,
    }

    impl ToolCommand for SampleCli {
        fn verbose(&self) -> bool {
            self.verbose
        }
    }

    fn strings(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    // Tests single-dash long options gain a second dash
    // Verified by leaving legacy flags untouched
    #[test]
    fn test_normalize_rewrites_legacy_flags() {
        let normalized = normalize_legacy_flags(["tool", "-clobber", "-verbose", "in.nii"]);
        assert_eq!(normalized, strings(&["tool", "--clobber", "--verbose", "in.nii"]));
    }

    // Tests short flags, GNU flags, numbers and the program name are preserved
    #[test]
    fn test_normalize_preserves_other_arguments() {
        let normalized = normalize_legacy_flags(["-tool", "-h", "--clobber", "-5", "-0.5"]);
        assert_eq!(normalized, strings(&["-tool", "-h", "--clobber", "-5", "-0.5"]));
    }

    // Tests arguments after a bare double dash pass through
    #[test]
    fn test_normalize_stops_at_double_dash() {
        let normalized = normalize_legacy_flags(["tool", "-clobber", "--", "-weird"]);
        assert_eq!(normalized, strings(&["tool", "--clobber", "--", "-weird"]));
    }

    // Tests legacy flags parse through clap after normalization
    #[test]
    fn test_legacy_flags_parse() {
        let cli = SampleCli::parse_from(normalize_legacy_flags([
            "sample_tool", "-clobber", "-double", "in.nii",
        ]));
        assert!(cli.clobber);
        assert!(!cli.verbose());
        assert_eq!(cli.output_type.output_type(), OutputType::Double);
    }

    // Tests the output type defaults to short
    #[test]
    fn test_output_type_default_short() {
        let cli = SampleCli::parse_from(["sample_tool", "in.nii"]);
        assert_eq!(cli.output_type.output_type(), OutputType::Short);
    }

    // Tests output type flags are mutually exclusive
    #[test]
    fn test_output_type_flags_conflict() {
        let result = SampleCli::try_parse_from(["sample_tool", "--byte", "--float", "in.nii"]);
        assert!(result.is_err());
    }

    // Tests successful runs map to a success exit code
    #[test]
    fn test_execute_success() {
        let code = execute(["sample_tool", "in.nii"], |cli: SampleCli| {
            assert_eq!(cli.input, PathBuf::from("in.nii"));
            Ok(())
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    // Tests tool errors map to failure
    // Verified by returning success for every run outcome
    #[test]
    fn test_execute_failure() {
        let code = execute(["sample_tool", "in.nii"], |cli: SampleCli| {
            Err(ToolError::MissingInput { path: cli.input })
        });
        assert_eq!(code, ExitCode::FAILURE);
    }

    // Tests usage errors fail without running the tool
    #[test]
    fn test_execute_usage_error() {
        let ran = Cell::new(false);
        let code = execute(["sample_tool"], |_: SampleCli| {
            ran.set(true);
            Ok(())
        });
        assert_eq!(code, ExitCode::FAILURE);
        assert!(!ran.get());
    }

    // Tests help requests succeed without running the tool
    #[test]
    fn test_execute_help_succeeds() {
        let ran = Cell::new(false);
        let code = execute(["sample_tool", "-help"], |_: SampleCli| {
            ran.set(true);
            Ok(())
        });
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!ran.get());
    }

    #[test]
    fn test_ensure_input_exists() {
        let temp_dir = TempDir::new().unwrap();
        let present = temp_dir.path().join("present.nii");
        std::fs::write(&present, b"x").unwrap();

        assert!(ensure_input_exists(&present).is_ok());
        let missing = ensure_input_exists(&temp_dir.path().join("missing.nii"));
        assert!(matches!(missing, Err(ToolError::MissingInput { .. })));
    }

    // Tests existing outputs require clobber
    // Verified by ignoring the clobber flag
    #[test]
    fn test_ensure_output_writable() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("out.tag");
        std::fs::write(&existing, b"x").unwrap();

        assert!(matches!(
            ensure_output_writable(&existing, false),
            Err(ToolError::OutputExists { .. })
        ));
        assert!(ensure_output_writable(&existing, true).is_ok());
        assert!(ensure_output_writable(&temp_dir.path().join("new.tag"), false).is_ok());
    }

    // Tests input lookup retries with the default suffix
    #[test]
    fn test_resolve_input_with_suffix() {
        let temp_dir = TempDir::new().unwrap();
        let tagged = temp_dir.path().join("points.tag");
        std::fs::write(&tagged, b"x").unwrap();

        let resolved = resolve_input(&temp_dir.path().join("points"), "tag").unwrap();
        assert_eq!(resolved, tagged);
        assert!(resolve_input(&temp_dir.path().join("other"), "tag").is_err());
        assert!(resolve_input(&temp_dir.path().join("points.txt"), "tag").is_err());
    }

    #[test]
    fn test_with_default_suffix() {
        assert_eq!(
            with_default_suffix(Path::new("out"), "xfm"),
            PathBuf::from("out.xfm")
        );
        assert_eq!(
            with_default_suffix(Path::new("out.txt"), "xfm"),
            PathBuf::from("out.txt")
        );
    }
}
