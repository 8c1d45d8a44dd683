use indoc::indoc;
use volcano::node::scan;
use volcano::wiki::NameIndex;

fn index_for(tmp: &std::path::Path) -> NameIndex {
    let site = scan(tmp).unwrap();
    NameIndex::build(&site)
}

#[test]
fn renders_headings_and_paragraphs() {
    let tmp = tempfile::tempdir().unwrap();
    let index = index_for(tmp.path());

    let input = indoc! {"
        # My heading

        Some content

        ## Some other heading
    "};
    let page = volcano::markdown::render(input, &index);

    assert!(page.html.contains("<h1"));
    assert!(page.html.contains("Some content"));
    assert!(page.html.contains(r#"<h2 id="some-other-heading">"#));
}

#[test]
fn tables_strikethrough_and_tasklists_are_gfm_enabled() {
    let tmp = tempfile::tempdir().unwrap();
    let index = index_for(tmp.path());

    let input = indoc! {"
        # Title

        | A | B |
        |---|---|
        | 1 | 2 |

        ~~gone~~

        - [ ] todo
        - [x] done
    "};
    let page = volcano::markdown::render(input, &index);

    assert!(page.html.contains("<table>"));
    assert!(page.html.contains("<del>gone</del>"));
    assert!(page.html.contains(r#"type="checkbox""#));
    assert!(page.html.contains("checked"));
}

#[test]
fn absolute_links_are_left_alone_and_internal_ones_are_tracked() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("bar.md"), "# Bar\n").unwrap();
    let index = index_for(tmp.path());

    let input = indoc! {"
        [an link](/bar/)
    "};
    let page = volcano::markdown::render(input, &index);

    assert!(page.html.contains(r#"href="/bar/""#));
    assert!(page.internal_refs.contains("/bar/"));
}

#[test]
fn nested_admonition_blocks_survive_surrounding_content() {
    let tmp = tempfile::tempdir().unwrap();
    let index = index_for(tmp.path());

    let input = indoc! {"
        # Title

        content before

        :::note
        inside the note
        :::

        content after
    "};
    let page = volcano::markdown::render(input, &index);

    assert!(page.html.contains("content before"));
    assert!(page.html.contains("admonition admonition-note"));
    assert!(page.html.contains("inside the note"));
    assert!(page.html.contains("content after"));
}

#[test]
fn fenced_code_with_an_unknown_language_still_gets_wrapped() {
    let tmp = tempfile::tempdir().unwrap();
    let index = index_for(tmp.path());

    let input = indoc! {"
        # Title

        ```not-a-real-language
        some text
        ```
    "};
    let page = volcano::markdown::render(input, &index);

    assert!(page.html.contains("code-block"));
    assert!(page.html.contains("some text"));
}

#[test]
fn inline_code_in_headings_is_kept_in_the_heading_text() {
    let tmp = tempfile::tempdir().unwrap();
    let index = index_for(tmp.path());

    let input = indoc! {"
        # Title

        ## Foo `bar` baz
    "};
    let page = volcano::markdown::render(input, &index);

    assert_eq!(page.toc[0].text, "Foo bar baz");
}

#[test]
fn raw_html_blocks_pass_through_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let index = index_for(tmp.path());

    let input = indoc! {r#"
        # Title

        <div class="raw">kept as-is</div>
    "#};
    let page = volcano::markdown::render(input, &index);

    assert!(page.html.contains(r#"<div class="raw">kept as-is</div>"#));
}
