use crate::cli::{Cli, Commands};
use clap::Parser;

#[test]
fn test_serve_defaults() {
    let cli = Cli::try_parse_from(["userspec", "serve"]).unwrap();
    match cli.command {
        Commands::Serve { spec, addr } => {
            assert_eq!(spec.to_string_lossy(), "api/swagger.yaml");
            assert!(addr.ends_with(":8080"));
        }
        other => panic!("Expected Serve command, got {other:?}"),
    }
}

#[test]
fn test_check_with_inline_instance() {
    let cli = Cli::try_parse_from([
        "userspec",
        "check",
        "--spec",
        "test.yaml",
        "--reference",
        "#/definitions/User",
        "--instance",
        "{}",
    ])
    .unwrap();
    match cli.command {
        Commands::Check {
            spec,
            reference,
            instance,
            instance_file,
        } => {
            assert_eq!(spec.to_string_lossy(), "test.yaml");
            assert_eq!(reference, "#/definitions/User");
            assert_eq!(instance.as_deref(), Some("{}"));
            assert!(instance_file.is_none());
        }
        other => panic!("Expected Check command, got {other:?}"),
    }
}

#[test]
fn test_check_instance_sources_conflict() {
    let parsed = Cli::try_parse_from([
        "userspec",
        "check",
        "--reference",
        "#/definitions/User",
        "--instance",
        "{}",
        "--instance-file",
        "x.json",
    ]);
    assert!(parsed.is_err());
}

#[test]
fn test_check_requires_reference() {
    assert!(Cli::try_parse_from(["userspec", "check"]).is_err());
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["userspec", "serve", "--spec", "a.yaml", "--addr", "127.0.0.1:9000"],
        vec!["userspec", "routes", "--spec", "a.yaml"],
        vec!["userspec", "check", "-r", "#/definitions/User"],
    ];
    for args in commands {
        let cli = Cli::try_parse_from(&args);
        assert!(cli.is_ok(), "Failed to parse command: {:?}", args);
    }
}
