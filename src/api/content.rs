use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use super::extract::ApiQuery;
use super::AppState;
use crate::error::{Error, Result};
use crate::models::{QuestionAnswer, TerritoryKind, TerritoryRef};

#[derive(Debug, Deserialize)]
pub struct FaqParams {
    pub territory_type: Option<String>,
    pub territory_id: Option<i64>,
}

impl FaqParams {
    fn territory(&self) -> Result<Option<TerritoryRef>> {
        match (self.territory_type.as_deref(), self.territory_id) {
            (None, None) => Ok(None),
            (Some(kind), Some(id)) => Ok(Some(TerritoryRef {
                kind: kind.parse::<TerritoryKind>()?,
                id,
            })),
            _ => Err(Error::validation(
                "territory_type and territory_id go together",
            )),
        }
    }
}

/// Global FAQ, or the entries of one territory
pub async fn list_faq(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<FaqParams>,
) -> Result<Json<Vec<QuestionAnswer>>> {
    let territory = params.territory()?;
    Ok(Json(state.db.list_question_answers(territory).await?))
}
