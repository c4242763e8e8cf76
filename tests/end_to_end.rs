//! Wizard answers flow through plan generation and a dry run

use archprov::catalog::SoftwareCatalog;
use archprov::command_runner::DryRunRunner;
use archprov::engine::{build_plan, StepAction, Target};
use archprov::report::{RunStatus, StepOutcome};
use archprov::types::{BootloaderTarget, PartitionType};
use archprov::wizard::{ConfigurationWizard, Widget, WizardInput, WizardOutcome, WizardState};
use archprov::worker::spawn_run;
use std::sync::Arc;

fn type_and_confirm(w: &mut ConfigurationWizard, text: &str) {
    if let Widget::Text(field) = w.widget() {
        for _ in 0..field.value().chars().count() {
            w.handle_input(WizardInput::Backspace);
        }
    }
    for c in text.chars() {
        w.handle_input(WizardInput::Char(c));
    }
    assert!(matches!(w.handle_input(WizardInput::Confirm), WizardOutcome::Advanced(_)));
}

fn highlight(w: &mut ConfigurationWizard, label: &str) {
    let Widget::Choice(list) = w.widget() else {
        panic!("{} has no choice list", w.state());
    };
    let index = list.items().iter().position(|i| i == label).expect("label offered"); // test: stock labels
    w.handle_input(WizardInput::Home);
    for _ in 0..index {
        w.handle_input(WizardInput::Down);
    }
}

fn pick(w: &mut ConfigurationWizard, label: &str) {
    highlight(w, label);
    assert!(matches!(w.handle_input(WizardInput::Confirm), WizardOutcome::Advanced(_)));
}

#[test]
fn test_wizard_to_dry_run() {
    let mut w = ConfigurationWizard::new(SoftwareCatalog::default());
    type_and_confirm(&mut w, "archbox");
    type_and_confirm(&mut w, "alice");
    type_and_confirm(&mut w, "root secret");
    type_and_confirm(&mut w, "user secret");
    pick(&mut w, "Europe/London");
    pick(&mut w, "EFI");
    pick(&mut w, "No");
    pick(&mut w, "Yes");
    type_and_confirm(&mut w, "2222");
    pick(&mut w, "No");
    pick(&mut w, "No");
    assert_eq!(w.state(), WizardState::AskSoftware);
    for title in ["Git", "Vim"] {
        highlight(&mut w, title);
        w.handle_input(WizardInput::SelectAndContinue);
    }
    pick_confirm(&mut w);

    let config = match w.handle_input(WizardInput::Confirm) {
        WizardOutcome::Submitted(config) => config,
        other => panic!("expected submission, got {:?}", other),
    };
    assert_eq!(config.hostname(), "archbox");
    assert_eq!(config.partition_type(), PartitionType::Efi);
    assert_eq!(config.software(), ["git", "vim"]);

    let plan = build_plan(&config, &Target::default(), 4096).unwrap();
    assert_eq!(plan.bootloader, BootloaderTarget::X86_64Efi);
    let body = match &plan.step("chroot-configure").unwrap().action {
        StepAction::Script { body } => body.clone(),
        other => panic!("chroot step is not a script: {:?}", other),
    };
    assert!(body.contains("Port 2222"));
    assert!(body.contains("pacman -S --noconfirm --needed git || warn"));
    assert!(body.contains("pacman -S --noconfirm --needed vim || warn"));
    assert!(body.contains("--target=x86_64-efi"));

    let step_count = plan.len();
    let report = spawn_run(plan, Arc::new(DryRunRunner))
        .unwrap()
        .wait()
        .expect("worker reports"); // test: worker always sends Finished
    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.records.len(), step_count);
    assert!(report
        .records
        .iter()
        .all(|r| r.outcome == StepOutcome::Succeeded));

    w.mark_finished();
    assert_eq!(w.state(), WizardState::Done);
}

/// Leave the software screen for the confirmation screen.
fn pick_confirm(w: &mut ConfigurationWizard) {
    assert!(matches!(
        w.handle_input(WizardInput::Confirm),
        WizardOutcome::Advanced(WizardState::Confirm)
    ));
}
