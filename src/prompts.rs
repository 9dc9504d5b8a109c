//! Fixed instructions sent to the edit and listing services.
//!
//! Both prompts are invariant: the edit instruction pins the room geometry
//! and only allows furniture/decor changes, and the listing prompt demands a
//! bare JSON object so [`crate::pipeline::extract::parse_items`] can take the
//! strict path. Items are described in Brazilian Portuguese.

/// Instruction for the image-edit model.
pub const EDIT_INSTRUCTION: &str = "Mantenha exatamente o tamanho, a proporção e o estilo do cômodo (paredes, janelas, piso, iluminação e estrutura). Altere apenas os móveis e os itens de decoração: substitua-os por versões mais modernas, bonitas e aconchegantes, sem mudar o layout nem as dimensões do ambiente.";

/// JSON field carrying the item array in the listing reply.
pub const ITEMS_FIELD: &str = "itens";

/// Instruction for the vision chat model that enumerates the redecorated room.
pub const LIST_ITEMS_PROMPT: &str = r#"Analise esta imagem de um cômodo decorado. Liste CADA móvel e item de decoração visível (sofá, cama, lustre, quadros, tapete, mesas, cadeiras, etc.).
Para cada item, escreva uma descrição curta em português do Brasil, por exemplo: "Sofá preto de 3 lugares de algodão", "Lustre com cristais 3 lâmpadas", "Quadro artístico tema África", "Cama de casal colchão Ortobom".
Retorne APENAS um JSON válido com um único objeto que tenha a chave "itens" (array de strings). Exemplo: {"itens": ["Sofá preto de 3 lugares", "Lustre com cristais"]}
Não inclua markdown, explicações ou texto fora do JSON."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_prompt_names_the_items_field() {
        assert!(LIST_ITEMS_PROMPT.contains(&format!("\"{ITEMS_FIELD}\"")));
    }

    #[test]
    fn edit_instruction_pins_geometry() {
        assert!(EDIT_INSTRUCTION.contains("proporção"));
        assert!(EDIT_INSTRUCTION.contains("Altere apenas os móveis"));
    }
}
