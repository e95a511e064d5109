use shared::{
    domain::{ContentKind, MemberRole, QuestionKind},
    protocol::{ContentDocument, OptionInput, QuestionInput, StepInput},
};
use storage::{FormationFields, Storage};

#[tokio::test]
async fn imported_formation_survives_duplication_and_original_deletion() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let owner = storage
        .upsert_user("trainer@example.com", Some("Trainer"))
        .await
        .expect("owner");
    let organization = storage
        .create_organization("Plant A", None, owner)
        .await
        .expect("organization");

    let formation = storage
        .import_formation(
            &FormationFields {
                external_id: "lockout".to_string(),
                name: "Lockout / tagout".to_string(),
                description: None,
                image_url: None,
                duration_minutes: Some(30),
                category: None,
                is_public: false,
            },
            &[
                ContentDocument {
                    kind: ContentKind::Guide,
                    title: "Procedure".to_string(),
                    description: None,
                    steps: vec![StepInput {
                        title: "Isolate energy".to_string(),
                        instruction: None,
                        image_url: None,
                    }],
                    questions: Vec::new(),
                },
                ContentDocument {
                    kind: ContentKind::Quiz,
                    title: "Check".to_string(),
                    description: None,
                    steps: Vec::new(),
                    questions: vec![QuestionInput {
                        text: "Who removes the lock?".to_string(),
                        kind: QuestionKind::Single,
                        explanation: None,
                        options: vec![
                            OptionInput {
                                text: "The person who applied it".to_string(),
                                is_correct: true,
                            },
                            OptionInput {
                                text: "Anyone".to_string(),
                                is_correct: false,
                            },
                        ],
                    }],
                },
            ],
        )
        .await
        .expect("import");
    storage
        .assign_training(organization, formation)
        .await
        .expect("assign");

    let copy = storage
        .duplicate_formation(formation, "lockout-copy", "Lockout / tagout (copy)")
        .await
        .expect("duplicate")
        .expect("copied");
    assert!(storage.delete_formation(formation).await.expect("delete"));

    let contents = storage.list_contents(copy).await.expect("contents");
    assert_eq!(contents.len(), 2);
    let questions = storage
        .list_questions(contents[1].content_id)
        .await
        .expect("questions");
    assert_eq!(questions[0].options.len(), 2);
    assert!(storage
        .list_trainings(organization)
        .await
        .expect("trainings")
        .is_empty());
    assert_eq!(
        storage.member_role(organization, owner).await.expect("role"),
        Some(MemberRole::Owner)
    );
}
