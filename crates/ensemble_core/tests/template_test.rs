use ensemble_core::{AgentRole, TaskTemplate};
use strum::IntoEnumIterator;

#[test]
fn ten_templates_custom_first() {
    let all = TaskTemplate::all();
    assert_eq!(all.len(), 10);
    assert_eq!(all[0].name, "Custom Task");
    assert!(all[0].prompt.is_empty());
}

#[test]
fn fill_replaces_first_placeholder() {
    let t = TaskTemplate::find("Code Analysis").unwrap();
    assert_eq!(
        t.fill("ensemble"),
        "Analyze the code in ensemble and provide insights"
    );
}

#[test]
fn custom_template_passes_text_through() {
    let t = TaskTemplate::find("custom task").unwrap();
    assert_eq!(t.fill("do the thing"), "do the thing");
}

#[test]
fn every_role_has_an_icon_and_description() {
    for role in AgentRole::iter() {
        assert!(!role.icon().is_empty());
        assert!(!role.description().is_empty());
    }
}
