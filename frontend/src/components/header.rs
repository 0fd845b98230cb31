use super::super::{Model, Msg};
use yew::prelude::*;

/// Renders the application header and the signed-in identity.
pub fn render_header(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-leaf"></i> {" Plant Disease Analysis"}</h1>
            <p class="subtitle">{"Upload a leaf photo, pick the plant type, and get a diagnosis"}</p>
            { render_user(model, ctx) }
        </header>
    }
}

fn render_user(model: &Model, ctx: &Context<Model>) -> Html {
    match &model.user {
        Some(user) => html! {
            <div class="auth-button-container">
                <div class="user-info">
                    <div class="user-details">
                        <span class="user-name">{ &user.name }</span>
                        <span class="user-email">{ &user.email }</span>
                    </div>
                    <button
                        class="logout-button"
                        onclick={ctx.link().callback(|_| Msg::SignOut)}
                        title="Logout"
                    >
                        <i class="fa-solid fa-sign-out-alt"></i>
                        {" Logout"}
                    </button>
                </div>
            </div>
        },
        None => html! {
            <div class="auth-button-container">
                <span class="auth-required">
                    <i class="fa-solid fa-lock"></i>
                    {" Sign in with your identity provider to analyze images"}
                </span>
            </div>
        },
    }
}
