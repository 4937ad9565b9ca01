mod common;

use common::{write_blank_pdf, PageReplies, PngPages};
use exam_grader::config::Config;
use exam_grader::infrastructure::{LopdfStore, PdfStore};
use exam_grader::models::ExtractionKind;
use exam_grader::App;
use std::path::Path;
use std::sync::Arc;

fn test_config(dir: &Path) -> Config {
    Config {
        continuation_window: 3,
        output_dir: dir.join("partitioned"),
        output_log_file: dir.join("run.log").display().to_string(),
        ..Config::default()
    }
}

fn app(dir: &Path, model: Arc<PageReplies>, pages: usize) -> App {
    App::with_parts(
        test_config(dir),
        model,
        Arc::new(PngPages(pages)),
        Arc::new(LopdfStore::new()),
    )
}

#[tokio::test]
async fn test_answers_continue_across_pages() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("student.pdf");
    let model = Arc::new(PageReplies::new([
        (0, "題號：1\n甲\n題號：2a\n乙"),
        (1, "接續乙\n題號：2b\n丙"),
        (2, "題號：a\n丁"),
    ]));

    let parsed = app(dir.path(), model.clone(), 3)
        .extract(&input, ExtractionKind::Answers, None)
        .await
        .unwrap();

    assert_eq!(parsed.sections.ids(), vec!["1", "2a", "2b", "2c"]);
    assert_eq!(parsed.sections.get("2a").unwrap().text, "乙\n接續乙");
    // 2b 之后单独的 a 不会回到 2a
    assert_eq!(parsed.sections.get("2c").unwrap().text, "丁");
    assert_eq!(parsed.sections.get("2b").unwrap().text, "丙");

    let saved = parsed.saved_to.unwrap();
    assert!(saved.ends_with("student_answers.json"));

    // 第二、三页的提示词带上前一页的题号
    let prompts = model.prompts.lock().unwrap();
    let prompt_for = |page: usize| {
        prompts
            .iter()
            .find(|(index, _)| *index == page)
            .map(|(_, prompt)| prompt.clone())
            .unwrap()
    };
    assert!(!prompt_for(0).contains("Note: the previous page"));
    assert!(prompt_for(1).contains("題號：2a（續）"));
    assert!(prompt_for(2).contains("題號：2b（續）"));

    // 运行日志记录了每一页
    let log = std::fs::read_to_string(dir.path().join("run.log")).unwrap();
    assert!(log.contains("第 3 页"));
}

#[tokio::test]
async fn test_registry_snaps_misread_labels() {
    let dir = tempfile::tempdir().unwrap();
    let questions = dir.path().join("questions.txt");
    std::fs::write(
        &questions,
        "題號：1\n配分：4\n甲\n題號：2a\n配分：3\n乙\n題號：2b\n配分：3\n丙\n題號：3\n配分：5\n丁",
    )
    .unwrap();

    let model = Arc::new(PageReplies::new([
        (0, "題號：1\n甲\n題號：2a\n乙"),
        (1, "題號：2d\n丙"),
        (2, "題號：8\n丁"),
    ]));
    let parsed = app(dir.path(), model, 3)
        .extract(
            &dir.path().join("student.pdf"),
            ExtractionKind::Answers,
            Some(&questions),
        )
        .await
        .unwrap();

    assert_eq!(parsed.sections.ids(), vec!["1", "2a", "2b", "3"]);
    assert_eq!(parsed.sections.get("3").unwrap().text, "丁");
}

#[tokio::test]
async fn test_saved_json_is_reloaded_without_model_calls() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(PageReplies::new([(0, "題號：1\n配分：10\n求值")]));
    let app = app(dir.path(), model.clone(), 1);

    let first = app
        .extract(&dir.path().join("exam.pdf"), ExtractionKind::Questions, None)
        .await
        .unwrap();
    assert_eq!(first.sections.get("1").unwrap().score, Some(10));

    let saved = first.saved_to.unwrap();
    let calls = model.prompts.lock().unwrap().len();
    let reloaded = app
        .extract(&saved, ExtractionKind::Questions, None)
        .await
        .unwrap();
    assert_eq!(reloaded.sections, first.sections);
    assert_eq!(model.prompts.lock().unwrap().len(), calls);
}

#[tokio::test]
async fn test_partition_splits_scan_per_student() {
    let dir = tempfile::tempdir().unwrap();
    let scan = dir.path().join("class.pdf");
    write_blank_pdf(&scan, 6);

    let model = Arc::new(PageReplies::new([
        (0, "Student ID: S1\nName: 甲"),
        (3, "Student ID: S2\nName: 乙"),
        (4, "Student ID: NOT_FOUND\nName: NOT_FOUND"),
    ]));
    let out = dir.path().join("out");
    let documents = app(dir.path(), model, 6)
        .partition(&scan, Some(&out))
        .await
        .unwrap();

    let store = LopdfStore::new();
    let summary: Vec<(String, usize, usize)> = documents
        .iter()
        .map(|doc| {
            (
                doc.range.student_id.clone(),
                doc.range.start_page,
                store.page_count(&doc.path).unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![("S1".to_string(), 0, 3), ("S2".to_string(), 3, 3)]
    );
    assert!(out.join("S2_answers.pdf").exists());
}

#[tokio::test]
async fn test_partition_without_students_fails() {
    let dir = tempfile::tempdir().unwrap();
    let scan = dir.path().join("class.pdf");
    write_blank_pdf(&scan, 2);

    let model = Arc::new(PageReplies::new(Vec::<(usize, &str)>::new()));
    let result = app(dir.path(), model, 2).partition(&scan, None).await;
    assert!(result.is_err());
}
