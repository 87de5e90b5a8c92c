use serde::Serialize;

use crate::error::AppError;

use super::{AppState, CommandError, CommandResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionSuggestion {
    pub title: String,
    pub description: String,
}

pub async fn descriptions_suggest(
    state: &AppState,
    title: String,
) -> CommandResult<DescriptionSuggestion> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(CommandError::from(AppError::validation(
            "A quest title is required to suggest a description",
        )));
    }

    let description = state.descriptions().suggest(&title).await;
    Ok(DescriptionSuggestion { title, description })
}
