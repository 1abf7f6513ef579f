//! HTML pages for the browser front end.
//!
//! Pages are small enough that plain string templates do the job. Every
//! interpolated value goes through `html_escape` first.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::config::StorageMode;
use crate::documents::HistoryEntry;
use crate::i18n::I18n;

/// Message lookup bound to one locale
pub struct Pages<'a> {
    i18n: &'a I18n,
    locale: &'a str,
}

impl<'a> Pages<'a> {
    pub fn new(i18n: &'a I18n, locale: &'a str) -> Self {
        Self { i18n, locale }
    }

    fn t(&self, key: &str) -> String {
        self.i18n.get(self.locale, key, None)
    }

    fn layout(&self, content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        body {{ background: linear-gradient(135deg, #1e293b 0%, #0f172a 100%); min-height: 100vh; color: #e2e8f0; }}
        .glass {{ background: rgba(255, 255, 255, 0.05); backdrop-filter: blur(16px); border: 1px solid rgba(255, 255, 255, 0.1); }}
        .btn-disabled {{ background: #475569 !important; color: #94a3b8 !important; cursor: not-allowed !important; }}
    </style>
</head>
<body class="flex flex-col items-center justify-start p-4 md:p-10">
{content}
</body>
</html>
"#,
            lang = attr(self.locale),
            title = text(&self.t("page-title")),
            content = content,
        )
    }

    /// Token login form, optionally with an error message
    pub fn login(&self, error: Option<&str>) -> String {
        let error_html = error
            .map(|e| format!(r#"<div class="text-red-400 text-center mb-4">{}</div>"#, text(e)))
            .unwrap_or_default();

        self.layout(&format!(
            r#"<div class="glass rounded-2xl p-8 w-full max-w-md mt-20">
    <h2 class="text-3xl font-bold mb-6 text-center text-white">{title}</h2>
    <form method="post" action="/login">
        <div class="mb-6"><input type="password" name="token" class="w-full px-4 py-3 rounded-xl bg-white/5 border border-white/10 text-white" placeholder="{placeholder}" required></div>
        {error_html}
        <button type="submit" class="w-full bg-blue-600 hover:bg-blue-700 text-white font-bold py-3 rounded-xl">{submit}</button>
    </form>
</div>"#,
            title = text(&self.t("login-title")),
            placeholder = attr(&self.t("login-token-placeholder")),
            submit = text(&self.t("login-submit")),
        ))
    }

    /// Upload form plus the history of processed documents
    pub fn index(&self, mode: StorageMode, history: &[HistoryEntry]) -> String {
        let history_html = if history.is_empty() {
            format!(
                r#"<div class="text-center py-8 text-gray-500 text-sm border-2 border-dashed border-gray-700 rounded-xl">{}</div>"#,
                text(&self.t("history-empty"))
            )
        } else {
            let rows: String = history
                .iter()
                .map(|entry| {
                    format!(
                        r#"
                    <tr class="hover:bg-white/5">
                        <td class="px-4 py-3 font-medium text-white break-all file-name-cell">{name}</td>
                        <td class="px-4 py-3 whitespace-nowrap text-gray-400">{time}</td>
                        <td class="px-4 py-3 text-right"><a href="{url}" target="_blank" class="px-3 py-1.5 bg-blue-500/20 text-blue-300 rounded-md text-xs font-bold">{download}</a></td>
                    </tr>"#,
                        name = text(&entry.filename),
                        time = text(&entry.timestamp),
                        url = attr(&entry.url),
                        download = text(&self.t("history-download")),
                    )
                })
                .collect();

            format!(
                r#"<div class="overflow-y-auto max-h-[320px] rounded-lg border border-gray-700">
            <table class="w-full text-left text-sm text-gray-300" id="historyTable">
                <thead class="sticky top-0 bg-slate-900 text-xs uppercase text-gray-400">
                    <tr><th class="px-4 py-3">{col_name}</th><th class="px-4 py-3">{col_time}</th><th class="px-4 py-3 text-right">{col_action}</th></tr>
                </thead>
                <tbody class="divide-y divide-gray-700/50">{rows}
                </tbody>
            </table>
            <div id="noResult" class="hidden text-center py-4 text-gray-500 text-sm">{no_match}</div>
        </div>"#,
                col_name = text(&self.t("history-col-name")),
                col_time = text(&self.t("history-col-time")),
                col_action = text(&self.t("history-col-action")),
                rows = rows,
                no_match = text(&self.t("history-no-match")),
            )
        };

        self.layout(&format!(
            r#"<div class="w-full max-w-4xl space-y-6">
    <div class="flex justify-between items-center mb-4">
        <h1 class="text-2xl font-bold text-white">{heading} <span class="text-xs text-blue-400 border border-blue-400/30 px-2 py-0.5 rounded ml-2">{mode}</span></h1>
        <a href="/logout" class="text-xs bg-white/5 px-4 py-2 rounded-lg border border-white/10">{logout}</a>
    </div>
    <div class="glass rounded-2xl p-8">
        <form method="post" action="/" enctype="multipart/form-data">
            <div class="border-2 border-dashed border-gray-600 rounded-xl p-10 text-center relative">
                <input type="file" name="file" accept=".md" class="absolute inset-0 w-full h-full opacity-0 cursor-pointer" required onchange="updateFileName(this)">
                <p id="fileLabel" class="text-lg font-medium text-gray-200">{drop_hint}</p>
            </div>
            <button type="submit" id="submitBtn" disabled class="w-full btn-disabled font-bold py-4 rounded-xl mt-6 text-white bg-blue-600" onclick="this.innerText={processing}">{choose_file}</button>
        </form>
    </div>
    <div class="glass rounded-2xl p-6">
        <div class="flex justify-between items-center mb-6 gap-4">
            <h2 class="text-xl font-bold">{history_heading}</h2>
            <input type="text" id="searchInput" onkeyup="filterTable()" class="p-2 text-sm text-white border border-gray-600 rounded-lg bg-white/5" placeholder="{search}">
        </div>
        {history_html}
    </div>
</div>
<script>
    function updateFileName(input) {{
        const btn = document.getElementById('submitBtn');
        if (input.files && input.files[0]) {{
            document.getElementById('fileLabel').innerText = input.files[0].name;
            btn.disabled = false;
            btn.innerText = {start};
            btn.classList.remove('btn-disabled');
        }}
    }}
    function filterTable() {{
        const filter = document.getElementById('searchInput').value.toLowerCase();
        const table = document.getElementById('historyTable');
        if (!table) return;
        let visible = false;
        for (const row of table.tBodies[0].rows) {{
            const match = row.cells[0].textContent.toLowerCase().includes(filter);
            row.style.display = match ? '' : 'none';
            visible = visible || match;
        }}
        document.getElementById('noResult').classList.toggle('hidden', visible);
    }}
</script>"#,
            heading = text(&self.t("index-heading")),
            mode = text(&mode.as_str().to_uppercase()),
            logout = text(&self.t("index-logout")),
            drop_hint = text(&self.t("index-drop-hint")),
            processing = attr(&js_string(&self.t("index-processing"))),
            choose_file = text(&self.t("index-choose-file")),
            history_heading = text(&self.t("history-heading")),
            search = attr(&self.t("history-search")),
            history_html = history_html,
            start = js_string(&self.t("index-start")),
        ))
    }

    /// Result page after a browser upload
    pub fn success(&self, download_url: &str, images_rewritten: usize) -> String {
        let count = images_rewritten.to_string();
        let saved = self
            .i18n
            .format(self.locale, "success-saved", &[("count", count.as_str())]);

        self.layout(&format!(
            r#"<div class="glass rounded-2xl p-10 w-full max-w-lg text-center mt-10">
    <h2 class="text-3xl font-bold mb-2 text-white">{title}</h2>
    <p class="text-gray-400 mb-8">{saved}</p>
    <div class="space-y-4">
        <a href="{url}" target="_blank" class="block w-full bg-white text-gray-900 font-bold py-3 rounded-xl">{download}</a>
        <a href="/" class="block w-full text-gray-400 hover:text-white py-2">{back}</a>
    </div>
</div>"#,
            title = text(&self.t("success-title")),
            saved = text(&saved),
            url = attr(download_url),
            download = text(&self.t("success-download")),
            back = text(&self.t("success-back")),
        ))
    }
}

/// Encode a value as a JavaScript string literal (JSON is a subset).
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace('<', "\\u003c")
}
