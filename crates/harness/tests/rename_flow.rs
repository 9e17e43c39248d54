use usher_core::AttachmentId;
use usher_engine::EngineError;
use usher_harness::TestWorkspace;
use usher_storage::Storage;

type TestResult = Result<(), Box<dyn std::error::Error>>;

// ============================================================================
// Walkthrough
// ============================================================================

#[test]
fn two_attachment_walkthrough() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx"), ("a2", "budget.xlsx")])?;

    let initial = ws.engine.reconcile(&opp)?;
    assert_eq!(initial.len(), 2);
    assert!(initial.iter().all(|a| !a.is_edited));

    let renamed = ws.rename(&opp, "a1", "final-spec.docx")?;
    assert_eq!(renamed.current_name, "final-spec.docx");
    assert_eq!(renamed.original_name, "spec.docx");
    assert!(renamed.is_edited);

    let history = ws.engine.history(&opp, &AttachmentId::new("a1"))?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_name, "spec.docx");
    assert_eq!(history[0].new_name, "final-spec.docx");

    let err = ws.rename(&opp, "a1", "final-spec.pdf").unwrap_err();
    assert!(matches!(err, EngineError::ExtensionChanged { expected: Some(ref e) } if e == ".docx"));

    // The extension check runs before the duplicate check, so a2 (.xlsx) trips it first.
    let err = ws.rename(&opp, "a2", "final-spec.docx").unwrap_err();
    assert!(matches!(err, EngineError::ExtensionChanged { .. }));

    // Same extension as a2, colliding with a1's working name.
    ws.set_attachments("opp-1", &[("a1", "spec.docx"), ("a2", "budget.docx")]);
    let err = ws.rename(&opp, "a2", "FINAL-SPEC.docx").unwrap_err();
    assert!(matches!(err, EngineError::DuplicateName));

    ws.set_attachments("opp-1", &[("a1", "spec.docx"), ("a2", "budget.xlsx")]);
    let err = ws.rename(&opp, "a1", "budget.xlsx").unwrap_err();
    assert!(matches!(err, EngineError::ExtensionChanged { .. }));

    // Rejections wrote nothing.
    assert_eq!(ws.engine.storage().history_count()?, 1);
    assert_eq!(ws.engine.storage().override_count()?, 1);
    Ok(())
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn original_name_fixed_at_first_rename() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx")])?;

    ws.rename(&opp, "a1", "v1.docx")?;
    // provider later reports a different name; the snapshot taken at first rename stays
    ws.set_attachments("opp-1", &[("a1", "provider-renamed.docx")]);
    let after = ws.rename(&opp, "a1", "v2.docx")?;
    assert_eq!(after.original_name, "spec.docx");

    let view = ws.attachment(&opp, "a1")?.ok_or("a1 missing")?;
    assert_eq!(view.original_name, "spec.docx");
    assert_eq!(view.current_name, "v2.docx");
    Ok(())
}

#[test]
fn renaming_back_to_original_clears_edited_flag() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx")])?;

    ws.rename(&opp, "a1", "working.docx")?;
    let back = ws.rename(&opp, "a1", "spec.docx")?;
    assert!(!back.is_edited);
    assert!(back.edited_at.is_some());

    let history = ws.engine.history(&opp, &AttachmentId::new("a1"))?;
    assert_eq!(history.len(), 2);
    assert_eq!(ws.engine.storage().no_op_override_count()?, 1);
    Ok(())
}

#[test]
fn rename_to_same_name_appends_one_history_row() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx"), ("a2", "notes.docx")])?;

    ws.rename(&opp, "a1", "final.docx")?;
    ws.rename(&opp, "a1", "final.docx")?;

    let history = ws.engine.history(&opp, &AttachmentId::new("a1"))?;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].previous_name, "final.docx");
    assert_eq!(history[1].new_name, "final.docx");

    // first-ever rename to the unchanged provider name also records a row
    ws.rename(&opp, "a2", "notes.docx")?;
    let history = ws.engine.history(&opp, &AttachmentId::new("a2"))?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_name, history[0].new_name);
    Ok(())
}

#[test]
fn history_forms_contiguous_chain() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "Statement of Work.pdf")])?;

    let names = ["sow-draft.pdf", "sow-v2.PDF", "SOW final.pdf", "sow-final.pdf", "sow.pdf"];
    for name in names {
        ws.rename(&opp, "a1", name)?;
    }

    let history = ws.engine.history(&opp, &AttachmentId::new("a1"))?;
    assert_eq!(history.len(), names.len());
    assert_eq!(history[0].previous_name, "Statement of Work.pdf");
    for pair in history.windows(2) {
        assert_eq!(pair[0].new_name, pair[1].previous_name);
        assert!(pair[0].seq < pair[1].seq);
    }
    assert_eq!(history.last().map(|h| h.new_name.as_str()), Some("sow.pdf"));
    Ok(())
}

#[test]
fn duplicate_check_is_case_insensitive() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a", "report.pdf"), ("b", "notes.pdf")])?;

    for candidate in ["report.pdf", "REPORT.pdf", "Report.PDF"] {
        let err = ws.rename(&opp, "b", candidate).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateName), "{candidate}");
    }
    let same = ws.rename(&opp, "a", "report.pdf")?;
    assert!(!same.is_edited);
    Ok(())
}

#[test]
fn freed_name_can_be_taken_by_another_attachment() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a", "report.pdf"), ("b", "notes.pdf")])?;

    ws.rename(&opp, "a", "report-old.pdf")?;
    let b = ws.rename(&opp, "b", "report.pdf")?;
    assert_eq!(b.current_name, "report.pdf");

    let err = ws.rename(&opp, "a", "report.pdf").unwrap_err();
    assert!(matches!(err, EngineError::DuplicateName));
    Ok(())
}

// ============================================================================
// Validation and not-found handling
// ============================================================================

#[test]
fn validation_failures_write_nothing() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx"), ("a2", "README")])?;

    let cases = [
        ("a1", "   ", "empty_name"),
        ("a1", "", "empty_name"),
        ("a1", "bad:name.docx", "invalid_characters"),
        ("a1", "what?.docx", "invalid_characters"),
        ("missing", "fine.docx", "attachment_not_found"),
        ("a1", "spec.pdf", "extension_changed"),
        ("a2", "README.md", "extension_changed"),
    ];
    for (att, name, expected) in cases {
        let err = ws.rename(&opp, att, name).unwrap_err();
        assert_eq!(err.kind(), expected, "{att} -> {name:?}");
        assert!(err.is_caller_correctable());
    }

    assert_eq!(ws.engine.storage().override_count()?, 0);
    assert_eq!(ws.engine.storage().history_count()?, 0);
    Ok(())
}

#[test]
fn extension_messages_are_specific() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx"), ("a2", "README")])?;

    let err = ws.rename(&opp, "a1", "spec.txt").unwrap_err();
    assert_eq!(err.to_string(), "Extension must remain \".docx\"");
    let err = ws.rename(&opp, "a2", "README.txt").unwrap_err();
    assert_eq!(err.to_string(), "Cannot add an extension to a file that has none");
    Ok(())
}

#[test]
fn unknown_opportunity_is_not_found() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let err = ws.rename(&"nope".into(), "a1", "x.docx").unwrap_err();
    assert!(matches!(err, EngineError::OpportunityNotFound(_)));
    assert_eq!(err.status_code(), 404);

    let err = ws.engine.reconcile(&"nope".into()).unwrap_err();
    assert_eq!(err.status_code(), 404);
    Ok(())
}

#[test]
fn rename_trims_whitespace() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx")])?;
    let renamed = ws.rename(&opp, "a1", "  trimmed.docx  ")?;
    assert_eq!(renamed.current_name, "trimmed.docx");
    Ok(())
}

// ============================================================================
// Actor attribution
// ============================================================================

#[test]
fn edited_by_resolves_name_then_email() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx"), ("a2", "notes.docx"), ("a3", "x.pdf")])?;
    let named = ws.add_user("u1", Some("Dana Reyes"), Some("dana@example.gov"))?;
    let email_only = ws.add_user("u2", None, Some("ops@example.gov"))?;
    let anonymous = ws.add_user("u3", None, None)?;

    let r1 = ws.rename_as(&opp, "a1", "one.docx", &named)?;
    assert_eq!(r1.edited_by.as_deref(), Some("Dana Reyes"));
    let r2 = ws.rename_as(&opp, "a2", "two.docx", &email_only)?;
    assert_eq!(r2.edited_by.as_deref(), Some("ops@example.gov"));
    let r3 = ws.rename_as(&opp, "a3", "three.pdf", &anonymous)?;
    assert!(r3.edited_by.is_none());

    let listing = ws.engine.reconcile(&opp)?;
    let by: Vec<_> = listing.iter().map(|a| a.edited_by.as_deref()).collect();
    assert_eq!(by, vec![Some("Dana Reyes"), Some("ops@example.gov"), None]);
    Ok(())
}

#[test]
fn last_editor_wins_and_history_keeps_each_actor() -> TestResult {
    let mut ws = TestWorkspace::new()?;
    let opp = ws.add_opportunity("opp-1", &[("a1", "spec.docx")])?;
    let dana = ws.add_user("u1", Some("Dana"), None)?;

    ws.rename_as(&opp, "a1", "v1.docx", &dana)?;
    let anon = ws.rename(&opp, "a1", "v2.docx")?;
    assert!(anon.edited_by.is_none());

    let history = ws.engine.history(&opp, &AttachmentId::new("a1"))?;
    assert_eq!(history[0].edited_by.as_ref().map(|u| u.as_str()), Some("u1"));
    assert!(history[1].edited_by.is_none());
    Ok(())
}
