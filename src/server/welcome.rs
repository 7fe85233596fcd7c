//! Bundled site served when a project has no routes yet.

/// Template name reserved for the welcome page.
pub const WELCOME_TEMPLATE_NAME: &str = "__hive_welcome__.html";

/// Manifest substituted for a missing or routeless `app.yaml`.
pub const WELCOME_MANIFEST: &str = r#"
routes:
  - rule: /
    template: __hive_welcome__.html
  - rule: 404
    template: __hive_welcome__.html
"#;

/// Tera source of the welcome page.
pub const WELCOME_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Your site is running</title>
  <style>
    body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif;
           max-width: 42rem; margin: 4rem auto; padding: 0 1rem; color: #222; }
    code, pre { background: #f4f4f4; border-radius: 3px; }
    code { padding: 0 .25rem; }
    pre { padding: 1rem; overflow-x: auto; }
    .path { color: #888; }
  </style>
</head>
<body>
  <h1>Your site is running</h1>
  <p class="path">Requested <code>{{ path() }}</code></p>
  <p>This project has no routes yet. Add a <code>routes</code> list to
     <code>app.yaml</code> and create the templates it names:</p>
  <pre>routes:
  - rule: /
    template: index.html
    content: home.yaml
  - rule: /blog/&lt;slug&gt;
    template: post.html
  - rule: 404
    template: not_found.html</pre>
  <p>Templates live in <code>templates/</code>, data files in
     <code>content/</code>, and stylesheets and scripts in
     <code>static/css</code> and <code>static/js</code>.</p>
</body>
</html>
"#;
