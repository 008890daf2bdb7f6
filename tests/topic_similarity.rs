// tests/topic_similarity.rs
use post_curator::ingest::types::Article;
use post_curator::topic::similarity::{filter_posted, jaccard, DEFAULT_SIMILARITY_THRESHOLD};

fn art(title: &str) -> Article {
    Article::new(title, "summary", "https://example.com", "Test")
}

#[test]
fn two_thirds_overlap_is_kept() {
    let history = vec!["AI news".to_string()];
    let arts = vec![art("AI news today")];
    let sim = jaccard("AI news today", "AI news");
    assert!((sim - 2.0 / 3.0).abs() < 1e-9);

    let out = filter_posted(&arts, &history, DEFAULT_SIMILARITY_THRESHOLD);
    assert_eq!(out.kept.len(), 1);
    assert_eq!(out.duplicates, 0);
}

#[test]
fn seven_of_eight_overlap_is_filtered() {
    let history = vec!["one two three four five six seven".to_string()];
    let arts = vec![art("one two three four five six seven eight")];
    assert!((jaccard(&arts[0].title, &history[0]) - 0.875).abs() < 1e-9);

    let out = filter_posted(&arts, &history, DEFAULT_SIMILARITY_THRESHOLD);
    assert!(out.kept.is_empty());
    assert_eq!(out.duplicates, 1);
}

#[test]
fn identical_title_in_any_case_is_filtered() {
    let history = vec!["old topic".to_string(), "GPT-5 Launch Recap".to_string()];
    let arts = vec![art("gpt-5 launch recap"), art("Unrelated robotics result")];
    let out = filter_posted(&arts, &history, DEFAULT_SIMILARITY_THRESHOLD);
    assert_eq!(out.kept.len(), 1);
    assert_eq!(out.kept[0].title, "Unrelated robotics result");
}

#[test]
fn exactly_at_threshold_is_kept() {
    // 7 shared of 10 in the union = 0.7, not strictly greater
    let history = vec!["a b c d e f g h i".to_string()];
    let arts = vec![art("a b c d e f g j")];
    assert!((jaccard(&arts[0].title, &history[0]) - 0.7).abs() < 1e-9);
    let out = filter_posted(&arts, &history, DEFAULT_SIMILARITY_THRESHOLD);
    assert_eq!(out.kept.len(), 1);
}

#[test]
fn untitled_articles_are_dropped_and_counted() {
    let arts = vec![art(""), art("   "), art("Real title")];
    let out = filter_posted(&arts, &[], DEFAULT_SIMILARITY_THRESHOLD);
    assert_eq!(out.untitled, 2);
    assert_eq!(out.kept.len(), 1);
}
