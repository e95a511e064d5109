use super::*;
use crate::{contents, test_context};
use blob_store::BlobStore;
use shared::{
    domain::QuestionKind,
    error::ErrorCode,
    protocol::{AssociateBuildRequest, CreateContentRequest},
};

fn request(external_id: Option<&str>, name: &str) -> CreateFormationRequest {
    CreateFormationRequest {
        external_id: external_id.map(str::to_string),
        name: name.to_string(),
        description: Some("  Basics of fire safety ".to_string()),
        duration_minutes: Some(30),
        category: Some("safety".to_string()),
        ..Default::default()
    }
}

fn question(text: &str) -> QuestionInput {
    QuestionInput {
        text: text.to_string(),
        kind: QuestionKind::Single,
        explanation: Some("Class B covers liquids".to_string()),
        options: vec![
            OptionInput {
                text: "A".to_string(),
                is_correct: false,
            },
            OptionInput {
                text: "B".to_string(),
                is_correct: true,
            },
        ],
    }
}

async fn formation_with_tree(ctx: &ApiContext) -> FormationId {
    let formation = create_formation(ctx, request(Some("fire-101"), "Fire safety"))
        .await
        .expect("formation");
    let guide = contents::create_content(
        ctx,
        formation.formation_id,
        CreateContentRequest {
            kind: ContentKind::Guide,
            title: "Extinguisher".to_string(),
            description: None,
        },
    )
    .await
    .expect("guide");
    contents::replace_steps(
        ctx,
        guide.content_id,
        vec![
            StepInput {
                title: "Pull the pin".to_string(),
                instruction: None,
                image_url: None,
            },
            StepInput {
                title: "Aim low".to_string(),
                instruction: Some("at the base".to_string()),
                image_url: None,
            },
        ],
    )
    .await
    .expect("steps");
    let quiz = contents::create_content(
        ctx,
        formation.formation_id,
        CreateContentRequest {
            kind: ContentKind::Quiz,
            title: "Check".to_string(),
            description: None,
        },
    )
    .await
    .expect("quiz");
    contents::replace_questions(ctx, quiz.content_id, vec![question("Which class?")])
        .await
        .expect("questions");
    formation.formation_id
}

#[tokio::test]
async fn create_generates_external_id_and_trims_fields() {
    let (ctx, _) = test_context().await;
    let formation = create_formation(&ctx, request(None, "  Fire safety "))
        .await
        .expect("create");

    assert_eq!(formation.name, "Fire safety");
    assert_eq!(formation.description.as_deref(), Some("Basics of fire safety"));
    assert!(uuid::Uuid::parse_str(&formation.external_id).is_ok());
    assert_eq!(formation.content_count, 0);
    assert_eq!(formation.build_ref, None);
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let (ctx, _) = test_context().await;
    create_formation(&ctx, request(Some("fire-101"), "Fire"))
        .await
        .expect("first");

    let duplicate = create_formation(&ctx, request(Some(" fire-101 "), "Other"))
        .await
        .expect_err("duplicate external id");
    assert_eq!(duplicate.code, ErrorCode::Validation);

    let unnamed = create_formation(&ctx, request(None, "   "))
        .await
        .expect_err("empty name");
    assert_eq!(unnamed.code, ErrorCode::Validation);

    let negative = create_formation(
        &ctx,
        CreateFormationRequest {
            duration_minutes: Some(-5),
            ..request(None, "Negative")
        },
    )
    .await
    .expect_err("negative duration");
    assert_eq!(negative.code, ErrorCode::Validation);

    assert_eq!(list_formations(&ctx, None).await.expect("list").len(), 1);
}

#[tokio::test]
async fn detail_nests_steps_and_questions_in_order() {
    let (ctx, _) = test_context().await;
    let formation_id = formation_with_tree(&ctx).await;

    let detail = get_formation(&ctx, formation_id).await.expect("detail");
    assert_eq!(detail.formation.content_count, 2);
    assert_eq!(detail.contents.len(), 2);

    let guide = &detail.contents[0];
    assert_eq!(guide.kind, ContentKind::Guide);
    assert_eq!(guide.order, 0);
    let steps: Vec<_> = guide.steps.iter().map(|s| (s.title.as_str(), s.order)).collect();
    assert_eq!(steps, vec![("Pull the pin", 0), ("Aim low", 1)]);
    assert!(guide.questions.is_empty());

    let quiz = &detail.contents[1];
    assert_eq!(quiz.order, 1);
    assert!(quiz.steps.is_empty());
    assert_eq!(quiz.questions[0].options.len(), 2);
    assert!(quiz.questions[0].options[1].is_correct);
    assert!(detail.build.is_none());
}

#[tokio::test]
async fn missing_formation_is_not_found() {
    let (ctx, _) = test_context().await;
    let missing = FormationId(404);

    assert_eq!(
        get_formation(&ctx, missing).await.expect_err("get").code,
        ErrorCode::NotFound
    );
    assert_eq!(
        update_formation(&ctx, missing, UpdateFormationRequest::default())
            .await
            .expect_err("update")
            .code,
        ErrorCode::NotFound
    );
    assert_eq!(
        delete_formation(&ctx, missing).await.expect_err("delete").code,
        ErrorCode::NotFound
    );
    assert_eq!(
        duplicate_formation(&ctx, missing)
            .await
            .expect_err("duplicate")
            .code,
        ErrorCode::NotFound
    );
}

#[tokio::test]
async fn update_leaves_absent_fields_untouched() {
    let (ctx, _) = test_context().await;
    let formation = create_formation(&ctx, request(Some("fire-101"), "Fire"))
        .await
        .expect("create");

    let updated = update_formation(
        &ctx,
        formation.formation_id,
        UpdateFormationRequest {
            name: Some("Fire safety".to_string()),
            is_public: Some(true),
            ..Default::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(updated.name, "Fire safety");
    assert!(updated.is_public);
    assert_eq!(updated.external_id, "fire-101");
    assert_eq!(updated.duration_minutes, Some(30));

    let err = update_formation(
        &ctx,
        formation.formation_id,
        UpdateFormationRequest {
            name: Some(" ".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect_err("blank name");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn update_trims_text_and_blank_clears_it() {
    let (ctx, _) = test_context().await;
    let formation = create_formation(&ctx, request(Some("fire-101"), "Fire"))
        .await
        .expect("create");

    let updated = update_formation(
        &ctx,
        formation.formation_id,
        UpdateFormationRequest {
            description: Some("   ".to_string()),
            category: Some("  hazmat  ".to_string()),
            image_url: Some(" https://cdn.test/fire.png ".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("update");
    assert_eq!(updated.description, None);
    assert_eq!(updated.category.as_deref(), Some("hazmat"));
    assert_eq!(updated.image_url.as_deref(), Some("https://cdn.test/fire.png"));
}

#[tokio::test]
async fn duplicate_copies_tree_but_not_build() {
    let (ctx, blobs) = test_context().await;
    let formation_id = formation_with_tree(&ctx).await;
    for file in blob_store::BuildFile::ALL {
        blobs
            .upload("builds", &file.blob_name("wisetrainer/Fire"), vec![1], file.content_headers())
            .await
            .expect("upload");
    }
    crate::associate_build(
        &ctx,
        formation_id,
        AssociateBuildRequest {
            build_ref: "Fire".to_string(),
            version: None,
        },
    )
    .await
    .expect("associate");

    let copy = duplicate_formation(&ctx, formation_id)
        .await
        .expect("duplicate");
    assert_ne!(copy.formation_id, formation_id);
    assert_eq!(copy.name, "Fire safety (copy)");
    let suffix = copy
        .external_id
        .strip_prefix("fire-101-copy-")
        .expect("copy prefix");
    assert!(suffix.parse::<i64>().is_ok());
    assert_eq!(copy.build_ref, None);

    let original = get_formation(&ctx, formation_id).await.expect("original");
    let copied = get_formation(&ctx, copy.formation_id).await.expect("copy");
    assert_eq!(copied.contents.len(), original.contents.len());
    assert_eq!(copied.contents[0].steps.len(), 2);
    assert_ne!(
        copied.contents[0].steps[0].step_id,
        original.contents[0].steps[0].step_id
    );
    assert_eq!(copied.contents[1].questions[0].options.len(), 2);
    assert!(copied.build.is_none());
    assert!(original.build.is_some());
}

#[tokio::test]
async fn export_then_import_recreates_the_tree() {
    let (ctx, _) = test_context().await;
    let formation_id = formation_with_tree(&ctx).await;

    let mut document = export_formation(&ctx, formation_id).await.expect("export");
    assert_eq!(document.version, FORMATION_DOCUMENT_VERSION);
    assert_eq!(document.formation.external_id.as_deref(), Some("fire-101"));
    assert_eq!(document.contents.len(), 2);

    let clash = import_formation(&ctx, document.clone())
        .await
        .expect_err("external id taken");
    assert_eq!(clash.code, ErrorCode::Validation);

    document.formation.external_id = None;
    let imported = import_formation(&ctx, document).await.expect("import");
    assert_eq!(imported.content_count, 2);
    assert_ne!(imported.external_id, "fire-101");

    let detail = get_formation(&ctx, imported.formation_id).await.expect("detail");
    assert_eq!(detail.contents[0].steps[1].instruction.as_deref(), Some("at the base"));
    assert_eq!(
        detail.contents[1].questions[0].explanation.as_deref(),
        Some("Class B covers liquids")
    );
}

#[tokio::test]
async fn import_validates_the_whole_document_first() {
    let (ctx, _) = test_context().await;

    let wrong_version = FormationDocument {
        version: 2,
        formation: request(None, "Future"),
        contents: Vec::new(),
    };
    assert_eq!(
        import_formation(&ctx, wrong_version)
            .await
            .expect_err("version")
            .code,
        ErrorCode::Validation
    );

    let mut bad_question = question("Pick one");
    bad_question.options[0].is_correct = true;
    let invalid = FormationDocument {
        version: FORMATION_DOCUMENT_VERSION,
        formation: request(Some("broken"), "Broken"),
        contents: vec![
            ContentDocument {
                kind: ContentKind::Guide,
                title: "Fine".to_string(),
                description: None,
                steps: Vec::new(),
                questions: Vec::new(),
            },
            ContentDocument {
                kind: ContentKind::Quiz,
                title: "Two correct".to_string(),
                description: None,
                steps: Vec::new(),
                questions: vec![bad_question],
            },
        ],
    };
    assert_eq!(
        import_formation(&ctx, invalid).await.expect_err("invalid").code,
        ErrorCode::Validation
    );

    let mixed = FormationDocument {
        version: FORMATION_DOCUMENT_VERSION,
        formation: request(None, "Mixed"),
        contents: vec![ContentDocument {
            kind: ContentKind::Guide,
            title: "Guide with questions".to_string(),
            description: None,
            steps: Vec::new(),
            questions: vec![question("Why?")],
        }],
    };
    assert_eq!(
        import_formation(&ctx, mixed).await.expect_err("mixed").code,
        ErrorCode::Validation
    );

    assert!(list_formations(&ctx, None).await.expect("list").is_empty());
}

#[tokio::test]
async fn delete_removes_formation_from_listing() {
    let (ctx, _) = test_context().await;
    let formation_id = formation_with_tree(&ctx).await;
    let other = create_formation(&ctx, request(Some("first-aid"), "First aid"))
        .await
        .expect("other");

    delete_formation(&ctx, formation_id).await.expect("delete");

    let remaining: Vec<_> = list_formations(&ctx, None)
        .await
        .expect("list")
        .into_iter()
        .map(|f| f.formation_id)
        .collect();
    assert_eq!(remaining, vec![other.formation_id]);
}

#[tokio::test]
async fn list_filters_by_search_text() {
    let (ctx, _) = test_context().await;
    create_formation(&ctx, request(Some("fire-101"), "Fire safety"))
        .await
        .expect("fire");
    create_formation(&ctx, request(Some("aid-1"), "First aid"))
        .await
        .expect("aid");

    let names: Vec<_> = list_formations(&ctx, Some("FIRE"))
        .await
        .expect("search")
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["Fire safety"]);
}
