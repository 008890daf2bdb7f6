// tests/topic_selection.rs
use std::sync::Arc;

use post_curator::history::InMemoryHistory;
use post_curator::ingest::types::Article;
use post_curator::oracle::mock::ScriptedOracle;
use post_curator::topic::TopicSelector;

fn story(i: usize) -> Article {
    Article::new(
        format!("Story {i} about topic{i}"),
        format!("Summary of story {i}"),
        format!("https://news.example.com/{i}"),
        "Wire",
    )
}

#[tokio::test]
async fn empty_input_short_circuits_without_oracle_calls() {
    let oracle = Arc::new(ScriptedOracle::new([Some("1: 9 - x"), Some("Selected: 1")]));
    let selector = TopicSelector::new(oracle.clone());

    let sel = selector.select_best_topic(&[], &["anything".to_string()]).await;
    assert!(sel.is_empty());
    assert!(sel.supporting_articles.is_empty());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn everything_already_posted_means_no_calls() {
    let oracle = Arc::new(ScriptedOracle::new([Some("1: 9 - x")]));
    let selector = TopicSelector::new(oracle.clone());

    let arts = vec![story(1)];
    let sel = selector
        .select_best_topic(&arts, &[arts[0].title.clone()])
        .await;
    assert!(sel.is_empty());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn unusable_scores_yield_no_selection() {
    let oracle = Arc::new(ScriptedOracle::new([Some("I cannot score these.")]));
    let selector = TopicSelector::new(oracle.clone());

    let sel = selector.select_best_topic(&[story(1), story(2)], &[]).await;
    assert!(sel.is_empty());
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn unparseable_final_pick_falls_back_to_top_scored() {
    let oracle = Arc::new(ScriptedOracle::new([
        Some("1: 4 - meh\n2: 8 - strong\n3: 6 - fine"),
        Some("They are all great choices."),
    ]));
    let selector = TopicSelector::new(oracle.clone());

    let sel = selector
        .select_best_topic(&[story(1), story(2), story(3)], &[])
        .await;
    assert_eq!(sel.topic, "Story 2 about topic2");
    assert_eq!(sel.supporting_articles.len(), 1);
    assert_eq!(sel.supporting_articles[0].score, Some(8.0));
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn failed_final_call_also_falls_back() {
    let oracle = Arc::new(ScriptedOracle::new([Some("1: 3 - a\n2: 5 - b"), None]));
    let selector = TopicSelector::new(oracle);

    let sel = selector.select_best_topic(&[story(1), story(2)], &[]).await;
    assert_eq!(sel.topic, "Story 2 about topic2");
}

#[tokio::test]
async fn twelve_in_ten_filtered_eight_scored_pick_three() {
    let articles: Vec<Article> = (0..12).map(story).collect();
    let history = vec![articles[0].title.clone(), articles[5].title.to_uppercase()];

    // 10 survive filtering; valid scores for the first 8, descending, two junk lines
    let mut scores = String::new();
    for i in 1..=8 {
        scores.push_str(&format!("{}: {:.1} - reason {}\n", i, 10.0 - i as f32 * 0.5, i));
    }
    scores.push_str("9: 11 - over the cap\n10: n/a - model skipped this one\n");

    let oracle = Arc::new(ScriptedOracle::new([
        Some(scores),
        Some("Selected: 3\nFinal Reason: best discussion driver".to_string()),
    ]));
    let selector = TopicSelector::new(oracle.clone());

    let sel = selector.select_best_topic(&articles, &history).await;

    // survivors are stories 1,2,3,4,6,...; the third ranked is story 3
    assert_eq!(sel.topic, "Story 3 about topic3");
    assert_eq!(sel.supporting_articles.len(), 1);
    assert_eq!(sel.supporting_articles[0].score, Some(8.5));
    assert_eq!(sel.supporting_articles[0].rationale.as_deref(), Some("reason 3"));

    let prompts = oracle.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("10. **Story 11 about topic11**"));
    assert!(!prompts[0].contains("Story 5 about topic5"));
    assert!(prompts[1].contains("These are the top 8 AI articles"));
}

#[tokio::test]
async fn history_store_feeds_the_filter() {
    let store = InMemoryHistory::new(["Story 1 about topic1"]);
    let oracle = Arc::new(ScriptedOracle::new([Some("1: 7 - only one"), Some("Selected: 1")]));
    let selector = TopicSelector::new(oracle);

    let sel = selector
        .select_with_store(&[story(1), story(2)], &store)
        .await
        .unwrap();
    assert_eq!(sel.topic, "Story 2 about topic2");
}

#[tokio::test]
async fn final_selector_with_no_candidates_is_empty() {
    let oracle = ScriptedOracle::new([Some("Selected: 1")]);
    let sel = post_curator::topic::selector::select(&oracle, &[]).await;
    assert!(sel.is_empty());
    assert!(sel.supporting_articles.is_empty());
    assert_eq!(oracle.calls(), 0);
}
