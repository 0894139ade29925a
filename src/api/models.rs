use crate::api::{ListedModel, ModelsResponse};
use crate::core::platform::PlatformError;
use crate::utils::url::construct_api_url;

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
    token: Option<&str>,
) -> Result<Vec<ListedModel>, PlatformError> {
    let models_url = construct_api_url(base_url, "models");
    let request = client
        .get(models_url)
        .header("Content-Type", "application/json");
    let request = crate::utils::auth::add_auth_headers(request, token);

    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(PlatformError::Api {
            status: status.as_u16(),
            message: error_text,
        });
    }

    let models_response = response.json::<ModelsResponse>().await?;
    Ok(models_response.into_models())
}
