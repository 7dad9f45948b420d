//! # Templates Maud
//!
//! Uma única página: formulário que envia a pergunta para
//! `POST /processar_pergunta` via `fetch` e mostra o JSON devolvido.
//!
//! ```text
//! ┌──────────────── Natural2SPARQL ────────────────┐
//! │ [ textarea: pergunta                         ] │
//! │ [ Processar Pergunta ]                         │
//! │ Resultado:                                     │
//! │ ┌────────────────────────────────────────────┐ │
//! │ │ { "templateId": ..., "placeholders": ... } │ │
//! │ └────────────────────────────────────────────┘ │
//! │ recursos: N sinônimos · M exemplos · K nomes   │
//! └────────────────────────────────────────────────┘
//! ```

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::resources::ResourceSummary;

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 20px; background-color: #f4f4f4; color: #333; }
.container { background-color: #fff; padding: 20px; border-radius: 8px; box-shadow: 0 0 10px rgba(0,0,0,0.1); max-width: 860px; margin: 0 auto; }
textarea, button { width: 100%; padding: 10px; margin-bottom: 10px; border-radius: 4px; border: 1px solid #ddd; box-sizing: border-box; }
textarea { height: 80px; }
button { background-color: #007bff; color: white; cursor: pointer; font-size: 16px; }
button:hover { background-color: #0056b3; }
pre { background-color: #eee; padding: 15px; border-radius: 4px; white-space: pre-wrap; word-wrap: break-word; }
pre.error { color: #b00020; }
footer { margin-top: 12px; font-size: 13px; color: #777; }
"#;

const SCRIPT: &str = r#"
document.getElementById('question-form').addEventListener('submit', async (event) => {
    event.preventDefault();
    const pergunta = document.getElementById('pergunta').value;
    const out = document.getElementById('resultado');
    out.textContent = 'Processando...';
    out.className = '';
    try {
        const response = await fetch('/processar_pergunta', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ pergunta }),
        });
        const data = await response.json();
        out.textContent = JSON.stringify(data, null, 2);
        if (!response.ok) out.className = 'error';
    } catch (err) {
        out.textContent = 'Erro na comunicação com o servidor: ' + err.message;
        out.className = 'error';
    }
});
"#;

/// Página principal.
pub fn index_page(summary: &ResourceSummary) -> Markup {
    html! {
        (DOCTYPE)
        html lang="pt-BR" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Natural2SPARQL — Perguntas sobre Ações" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                div class="container" {
                    h1 { "Natural2SPARQL" }
                    p { "Pergunte em português sobre cotações, tickers ou setores da B3." }
                    form id="question-form" {
                        textarea id="pergunta" name="pergunta"
                            placeholder="Ex.: Qual foi o preço de fechamento da VALE3 em 05/03/2024?" {}
                        button type="submit" { "Processar Pergunta" }
                    }
                    h2 { "Resultado:" }
                    pre id="resultado" { "Aguardando pergunta..." }
                    footer {
                        (summary.synonym_keys) " métricas · "
                        (summary.exemplars) " exemplos · "
                        (summary.gazetteer_entries) " nomes no gazetteer"
                    }
                }
                script { (PreEscaped(SCRIPT)) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_posts_to_question_endpoint() {
        let page = index_page(&ResourceSummary {
            synonym_keys: 9,
            exemplars: 4,
            gazetteer_entries: 12,
        })
        .into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("/processar_pergunta"));
        assert!(page.contains("12 nomes no gazetteer"));
    }
}
