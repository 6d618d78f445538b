// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TEXT UTILITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//
// Limpeza de células de planilha e listas separadas por vírgula.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Remove caracteres de controle e normaliza whitespace
pub fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Verifica se o texto é vazio ou só espaços
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Divide uma lista separada por vírgulas, limpando e descartando vazios
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(clean_text)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Célula opcional: `None` se vazia
pub fn non_blank(text: &str) -> Option<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
