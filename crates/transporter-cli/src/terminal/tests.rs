use super::*;

fn options() -> Vec<String> {
    vec!["staging".to_string(), "qa".to_string(), "Dump to file".to_string()]
}

#[test]
fn test_choice_by_number_or_label() {
    let options = options();
    assert_eq!(parse_choice("1", &options), Some(&options[0]));
    assert_eq!(parse_choice(" 3 ", &options), Some(&options[2]));
    assert_eq!(parse_choice("qa", &options), Some(&options[1]));
    assert_eq!(parse_choice("Dump to file", &options), Some(&options[2]));
}

#[test]
fn test_out_of_range_choice_is_rejected() {
    let options = options();
    assert_eq!(parse_choice("0", &options), None);
    assert_eq!(parse_choice("4", &options), None);
    assert_eq!(parse_choice("prod", &options), None);
    assert_eq!(parse_choice("", &options), None);
}

#[test]
fn test_confirmation_defaults_to_no() {
    assert!(parse_confirmation("y"));
    assert!(parse_confirmation("YES"));
    assert!(!parse_confirmation(""));
    assert!(!parse_confirmation("n"));
    assert!(!parse_confirmation("sure"));
}

#[test]
fn test_empty_path_answer_uses_default() {
    let default = Path::new("./dump.sql");
    assert_eq!(resolve_path("", default), default.to_path_buf());
    assert_eq!(resolve_path(" /tmp/a.sql ", default), PathBuf::from("/tmp/a.sql"));
}

#[test]
fn test_progress_messages() {
    assert_eq!(
        progress_message(Phase::Export, ProgressSample::new(3 * 1024 * 1024, None)),
        "Exporting... (3.0 MiB)"
    );
    assert_eq!(
        progress_message(Phase::Import, ProgressSample::new(410, Some(1000))),
        "Importing... (41.0%)"
    );
    assert_eq!(
        progress_message(Phase::Import, ProgressSample::new(2000, Some(1000))),
        "Importing... (100.0%)"
    );
    assert_eq!(starting_message(Phase::Wipe), "Wiping destination...");
}

#[test]
fn test_capitalize() {
    assert_eq!(capitalize("export"), "Export");
    assert_eq!(capitalize(""), "");
}

#[tokio::test]
async fn test_interrupt_ends_pending_prompt() {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let answer = tokio::time::timeout(
        Duration::from_secs(5),
        interruptible(&token, std::future::pending::<Result<String>>()),
    )
    .await
    .expect("prompt kept waiting after the interrupt");
    assert!(matches!(answer, Err(TransferError::Prompt(ref m)) if m == "interrupted"));
}

#[tokio::test]
async fn test_answer_passes_through_without_interrupt() {
    let token = CancellationToken::new();
    let answer = interruptible(&token, async { Ok("2".to_string()) }).await;
    assert_eq!(answer.unwrap(), "2");
}

#[tokio::test]
async fn test_presenter_prompts_fail_once_cancelled() {
    let token = CancellationToken::new();
    token.cancel();
    let presenter = TerminalPresenter::new(token);

    let err = presenter.confirm("Continue?").await.unwrap_err();
    assert!(matches!(err, TransferError::Prompt(_)));
    let err = presenter
        .select("Select SOURCE:", &options())
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Prompt(_)));
}
