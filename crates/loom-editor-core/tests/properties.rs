use loom_editor_core::{
    ChainBuilder, CommandError, Editor, EditorConfig, MarkKind, MarkState, Selection, TextAlign,
    from_html, from_json, to_html, to_json,
};

fn editor(html: &str) -> Editor {
    Editor::new(EditorConfig {
        initial_content: Some(html.to_owned()),
        ..EditorConfig::default()
    })
}

const RICH: &str = concat!(
    r#"<p style="text-align: right">Intro with <strong>bold</strong>, <em><s>both</s></em> and "#,
    r#"<span style="font-size: 24px"><span style="color: #3b82f6">blue</span></span></p>"#,
    r#"<ul><li><p>one</p></li><li><p><code>two()</code></p></li></ul>"#,
    r#"<ol><li><p>first</p></li></ol>"#,
    r#"<pre><code class="language-rust">fn main() {&lt;&gt;}</code></pre>"#,
    r#"<hr><img src="cat.png" alt="a cat">"#,
);

#[test]
fn html_round_trip_preserves_structure() {
    let doc = from_html(RICH);
    let html = to_html(&doc);
    assert_eq!(html, RICH);
    assert!(from_html(&html).content_eq(&doc));
}

#[test]
fn json_round_trip_preserves_structure() {
    let doc = from_html(RICH);
    let back = from_json(to_json(&doc)).unwrap();
    assert!(back.content_eq(&doc));
}

#[test]
fn toggle_bold_twice_restores_marks() {
    let mut editor = editor("<p><em>hello</em> world</p>");
    let original = editor.to_html();
    for (anchor, head) in [(0, 5), (6, 11)] {
        let range = Selection::in_block(0, anchor, head);
        assert!(editor.chain().set_selection(range).toggle_bold().run());
        assert_ne!(editor.to_html(), original);
        assert!(editor.chain().toggle_bold().run());
        assert_eq!(editor.to_html(), original);
    }
}

#[test]
fn undo_and_redo_restore_exact_states() {
    let mut editor = editor("<p>hello</p><p>world</p>");
    let before = (editor.document().clone(), editor.selection());

    assert!(
        editor
            .chain()
            .set_selection(Selection::in_block(1, 0, 5))
            .toggle_italic()
            .run()
    );
    let after = (editor.document().clone(), editor.selection());

    assert!(editor.chain().undo().run());
    assert_eq!((editor.document().clone(), editor.selection()), before);

    assert!(editor.chain().redo().run());
    assert_eq!((editor.document().clone(), editor.selection()), after);
}

#[test]
fn collapsed_font_size_applies_to_next_character() {
    let mut editor = editor("<p>ab</p>");
    let doc = editor.document().clone();

    assert!(editor.chain().set_font_size("24px").run());
    assert_eq!(editor.document(), &doc);
    assert_eq!(editor.snapshot().font_size, MarkState::Uniform("24px".into()));

    assert!(editor.chain().insert_text("c").run());
    insta::assert_snapshot!(editor.to_html(), @r#"<p>ab<span style="font-size: 24px">c</span></p>"#);
    // stored marks are consumed by the insertion
    assert!(editor.state().stored_marks.is_none());
}

#[test]
fn clearing_color_keeps_other_text_style_attributes() {
    let mut editor = editor(
        r#"<p><span style="color: #ef4444; font-family: serif">styled</span> <span style="color: #ef4444">red</span></p>"#,
    );
    assert!(
        editor
            .chain()
            .select_all()
            .unset_color()
            .run()
    );
    insta::assert_snapshot!(editor.to_html(), @r#"<p><span style="font-family: serif">styled</span> red</p>"#);
}

#[test]
fn text_align_leaves_siblings_unchanged() {
    let mut editor = editor("<p>one</p><p>two</p><p>three</p>");
    assert!(
        editor
            .chain()
            .set_selection(Selection::in_block(1, 1, 1))
            .set_text_align(TextAlign::Center)
            .run()
    );
    insta::assert_snapshot!(editor.to_html(), @r#"<p>one</p><p style="text-align: center">two</p><p>three</p>"#);
}

#[test]
fn can_never_mutates() {
    let editor = editor("<p>hello</p>");
    let state = editor.state().clone();
    assert!(editor.can().chain().select_all().toggle_bold().toggle_code().run());
    assert!(editor.can().chain().insert_text("more").split_block().run());
    assert!(!editor.can().chain().redo().run());
    assert_eq!(editor.state(), &state);
    assert!(!editor.can_undo());
}

#[test]
fn failed_chain_applies_nothing() {
    let mut editor = editor("<p>hello</p>");
    let state = editor.state().clone();

    let err = editor
        .chain()
        .select_all()
        .toggle_bold()
        .set_selection(Selection::in_block(9, 0, 0))
        .try_run()
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidSelection { .. }));
    assert_eq!(editor.state(), &state);

    // undo inside the chain succeeds, the second one has nothing left
    assert!(
        !editor
            .chain()
            .select_all()
            .toggle_bold()
            .undo()
            .undo()
            .run()
    );
    assert_eq!(editor.state(), &state);
    assert!(!editor.can_undo());
}

#[test]
fn stored_marks_follow_cursor_moves() {
    let mut editor = editor("<p>plain <strong>bold</strong> tail</p>");
    assert!(
        editor
            .chain()
            .set_selection(Selection::in_block(0, 2, 2))
            .toggle_italic()
            .run()
    );
    assert!(editor.snapshot().is_active(MarkKind::Italic));

    // same ambient marks: stored marks survive
    assert!(editor.chain().set_selection(Selection::in_block(0, 3, 3)).run());
    assert!(editor.snapshot().is_active(MarkKind::Italic));

    // into bold text: stored marks dropped, ambient marks take over
    assert!(editor.chain().set_selection(Selection::in_block(0, 9, 9)).run());
    let snapshot = editor.snapshot();
    assert!(!snapshot.is_active(MarkKind::Italic));
    assert!(snapshot.is_active(MarkKind::Bold));
}

#[test]
fn typed_tabs_survive_html() {
    let mut editor = editor("");
    assert!(editor.chain().insert_text("a\tb").run());
    let html = editor.to_html();
    assert_eq!(html, "<p>a\tb</p>");
    assert!(from_html(&html).content_eq(editor.document()));
}

#[test]
fn blank_font_size_is_refused() {
    let mut editor = editor("<p>ab</p>");
    assert!(!editor.chain().select_all().set_font_size("").run());
    assert!(!editor.chain().select_all().set_font_size("   ").run());
    assert_eq!(editor.to_html(), "<p>ab</p>");
    assert!(matches!(
        editor.chain().select_all().set_font_size("").try_run(),
        Err(CommandError::InvalidMarkValue { kind: MarkKind::FontSize, .. })
    ));
}
