use crate::server::state::AppState;
use axum::{extract::State, response::Html};

/// Landing page linking the served roots and the live manifest
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let manifest = format!("/manifests/{}", state.config.manifest_name);

    Html(format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head><title>livehls</title></head>\n\
         <body>\n\
         <h1>livehls {version}</h1>\n\
         <p>Live playlist: <a href=\"{manifest}\">{manifest}</a></p>\n\
         <ul>\n\
         <li><a href=\"/media/\">/media/</a></li>\n\
         <li><a href=\"/ads/\">/ads/</a></li>\n\
         <li><a href=\"/manifests/\">/manifests/</a></li>\n\
         </ul>\n\
         </body>\n\
         </html>\n",
        version = env!("CARGO_PKG_VERSION"),
        manifest = manifest,
    ))
}
