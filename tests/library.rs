use anyhow::Result;
use ayeeye::{
    AnnotatedText, BiasAnnotation, BiasHierarchy, EmphasisMap, ForceLayout, HierarchyGraph,
    ROOT_ID, ReviewSession, apply_edit, locate,
};

fn annotation(phrase: &str, suggestion: &str, category: &str, subcategory: &str) -> BiasAnnotation {
    BiasAnnotation {
        phrase: phrase.to_string(),
        suggestion: suggestion.to_string(),
        hierarchy: Some(BiasHierarchy {
            category: category.to_string(),
            subcategory: Some(subcategory.to_string()),
            kind: Some("Implicit Bias".to_string()),
        }),
        legacy_type: None,
    }
}

#[test]
fn whole_sentence_annotation_flows_through_text_and_graph() -> Result<()> {
    let text = "Women are naturally better at multitasking than men.";
    let annotations = vec![annotation(
        text,
        "People vary individually in multitasking ability.",
        "Human Bias",
        "Cognitive",
    )];

    let spans = locate(text, &annotations);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].start, 0);
    assert_eq!(spans[0].end, text.len());
    assert_eq!(spans[0].hierarchy_key, "human-bias-cognitive-implicit-bias");

    let markup = AnnotatedText::render(text, &spans);
    assert_eq!(markup.highlight_count(), 1);
    assert_eq!(markup.source_text(), text);
    let html = markup.to_html();
    assert!(html.contains(r#"data-hierarchy-key="human-bias-cognitive-implicit-bias""#));

    let graph = HierarchyGraph::build(&annotations);
    let chain = graph.ancestor_chain("human-bias-cognitive-implicit-bias");
    assert_eq!(
        chain,
        vec![
            "human-bias-cognitive-implicit-bias".to_string(),
            "human-bias-cognitive".to_string(),
            "human-bias".to_string(),
            ROOT_ID.to_string(),
        ]
    );
    let leaf = graph
        .node("human-bias-cognitive-implicit-bias")
        .expect("leaf node should exist");
    assert_eq!(leaf.phrases, vec![text.to_string()]);

    Ok(())
}

#[test]
fn spans_are_sorted_and_disjoint() {
    let text = "First the cats slept, then the cats slept again, then the dogs barked.";
    let annotations = vec![
        annotation("the dogs barked", "", "Human Bias", "Cognitive"),
        annotation("the cats slept", "", "Human Bias", "Cognitive"),
        annotation("the cats slept", "", "Human Bias", "Cognitive"),
    ];

    let spans = locate(text, &annotations);
    assert_eq!(spans.len(), 3);
    for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start, "spans must not overlap");
    }
    // Duplicate phrases consume occurrences left to right.
    assert_eq!(spans[0].phrase, "the cats slept");
    assert_eq!(spans[0].start, text.find("the cats slept").unwrap());
    assert_eq!(spans[1].phrase, "the cats slept");
    assert!(spans[1].start > spans[0].end);
    assert_eq!(spans[2].phrase, "the dogs barked");
}

#[test]
fn hallucinated_phrases_are_dropped_not_fatal() {
    let text = "Only this sentence exists.";
    let annotations = vec![
        annotation("nowhere to be found", "", "Human Bias", "Cognitive"),
        annotation("this sentence", "", "Human Bias", "Cognitive"),
    ];

    let spans = locate(text, &annotations);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].phrase, "this sentence");
}

#[test]
fn counts_roll_up_per_category_and_root() {
    let annotations = vec![
        annotation("a", "", "Human Bias", "Cognitive"),
        annotation("b", "", "Human Bias", "Cognitive"),
        annotation("c", "", "Human Bias", "Social"),
    ];

    let graph = HierarchyGraph::build(&annotations);
    assert_eq!(graph.category_count(), 1);
    assert_eq!(graph.instance_count(), 3);
    assert_eq!(graph.node("human-bias").unwrap().count, Some(3));
    assert_eq!(graph.node("human-bias-cognitive").unwrap().count, Some(2));
    assert_eq!(graph.node("human-bias-social").unwrap().count, Some(1));
    assert_eq!(graph.node(ROOT_ID).unwrap().count, Some(3));
}

#[test]
fn legacy_flat_annotations_fold_under_general_bias() {
    let annotations = vec![BiasAnnotation {
        phrase: "obviously".to_string(),
        suggestion: "according to the cited survey".to_string(),
        hierarchy: None,
        legacy_type: Some("Anchoring Bias".to_string()),
    }];

    let graph = HierarchyGraph::build(&annotations);
    let leaf = graph
        .node("general-bias-general-anchoring-bias")
        .expect("legacy annotation should land on a leaf");
    assert_eq!(leaf.parent_id.as_deref(), Some("general-bias-general"));
    assert_eq!(graph.node("general-bias").unwrap().label, "General Bias");
}

#[test]
fn edit_replaces_exactly_the_span() -> Result<()> {
    let text = "The cats are lazy";
    let annotations = vec![annotation("cats", "dogs", "Human Bias", "Cognitive")];
    let spans = locate(text, &annotations);
    assert_eq!(spans.len(), 1);

    let receipt = apply_edit(text, &spans[0], "dogs")?;
    assert_eq!(receipt.text, "The dogs are lazy");
    assert_eq!(receipt.span.start, 4);
    assert_eq!(receipt.span.end, 8);
    assert_eq!(receipt.span.phrase, "dogs");
    assert_eq!(receipt.original, "cats");

    Ok(())
}

#[test]
fn stale_spans_are_rejected_without_touching_text() {
    let annotations = vec![annotation("cats", "dogs", "Human Bias", "Cognitive")];
    let spans = locate("The cats are lazy", &annotations);

    // The text moved underneath the span.
    let err = apply_edit("The lazy cats nap", &spans[0], "dogs").unwrap_err();
    assert!(err.to_string().contains("stale edit"));
}

#[test]
fn activation_emphasizes_the_ancestor_chain_only() {
    let annotations = vec![
        annotation("a", "", "Human Bias", "Cognitive"),
        annotation("b", "", "Machine Bias", "Data"),
    ];
    let graph = HierarchyGraph::build(&annotations);

    let emphasis = EmphasisMap::for_activation(&graph, "human-bias-cognitive-implicit-bias");
    let on_chain = &emphasis.nodes["human-bias-cognitive"];
    assert_eq!(on_chain.opacity, 1.0);
    assert!(on_chain.outlined);
    let off_chain = &emphasis.nodes["machine-bias"];
    assert!(off_chain.opacity < 1.0);
    assert!(!off_chain.outlined);

    // Unknown keys fall back to the neutral state.
    let fallback = EmphasisMap::for_activation(&graph, "no-such-node");
    assert_eq!(fallback, EmphasisMap::neutral(&graph));
}

#[test]
fn layout_settles_with_root_pinned_at_center() -> Result<()> {
    let annotations = vec![
        annotation("a", "", "Human Bias", "Cognitive"),
        annotation("b", "", "Human Bias", "Social"),
        annotation("c", "", "Machine Bias", "Data"),
    ];
    let graph = HierarchyGraph::build(&annotations);

    let mut layout = ForceLayout::new(&graph, 800.0, 600.0)?;
    let ticks = layout.run_to_idle(1_000);
    assert!(ticks < 1_000, "simulation should cool before the tick cap");
    assert!(layout.is_idle());

    let root = layout.position(ROOT_ID).expect("root has a position");
    assert!((root.x - 400.0).abs() < f32::EPSILON);
    assert!((root.y - 300.0).abs() < f32::EPSILON);

    for (id, pos) in layout.positions() {
        assert!(
            pos.x.is_finite() && pos.y.is_finite(),
            "node {id} should have a finite position"
        );
    }

    Ok(())
}

#[test]
fn session_edit_rewrites_text_and_relocates_spans() -> Result<()> {
    let text = "The cats are lazy";
    let annotations = vec![annotation("cats", "dogs", "Human Bias", "Cognitive")];

    let mut session = ReviewSession::new(800.0, 600.0);
    session.analyze(text, annotations);
    assert_eq!(session.spans().len(), 1);

    session.activate("human-bias-cognitive-implicit-bias");
    assert_eq!(session.span_active_flags(), vec![true]);

    let receipt = session.apply_edit("human-bias-cognitive-implicit-bias")?;
    assert_eq!(receipt.text, "The dogs are lazy");
    assert_eq!(session.text(), "The dogs are lazy");
    // Re-rendered spans track the replacement as ordinary text.
    assert_eq!(session.spans().len(), 1);
    assert_eq!(session.spans()[0].phrase, "dogs");
    // An edit resets any active highlight.
    assert_eq!(session.span_active_flags(), vec![false]);

    let err = session.apply_edit("no-such-key").unwrap_err();
    assert!(err.to_string().contains("stale edit"));

    Ok(())
}
