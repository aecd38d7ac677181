/// Body of a single-highlight note
pub const DEFAULT_NOTE_TEMPLATE: &str = "## Title: [[{{bookPath}}|{{title}}]]

### by: [[{{authors}}]]

### Chapter: {{chapter}}

Page: {{page}}

**=={{highlight}}==**

{{text}}";

/// Body of a book-summary note. The dataviewjs block lists the book's
/// highlight notes ordered by page.
pub const DEFAULT_BOOK_TEMPLATE: &str = r#"# Title: {{data.title}}

<progress value="{{metadata.percent_finished}}" max="100"> </progress>
```dataviewjs
const title = dv.current()['koreader-sync'].metadata.managed_title
dv.pages().where(n => {
return n['koreader-sync'] && n['koreader-sync'].type == 'single-highlight-note' && n['koreader-sync'].metadata.managed_book_title == title
}).sort(p => p['koreader-sync'].data.page).forEach(p => dv.paragraph(dv.fileLink(p.file.name, true), {style: 'test-css'}))
```
"#;
