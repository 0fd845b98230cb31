use super::super::Model;
use super::utils::category_label;
use yew::prelude::*;

/// Most recent analyses of the signed-in user, newest first.
pub fn render_history(model: &Model) -> Html {
    let recent = &model.recent;
    if model.user.is_none() || recent.is_empty() {
        return html! {};
    }

    html! {
        <div class="history-container">
            <h3>{"Recent Analyses"}</h3>
            <ul class="history-list">
                { for recent.iter().map(|record| html! {
                    <li
                        key={record.id.to_string()}
                        class={classes!("history-item", if record.is_healthy() { "healthy" } else { "diseased" })}
                    >
                        <span class="history-label">{ &record.predicted_label }</span>
                        <span class="history-plant">{ category_label(record.plant_category) }</span>
                        <span class="history-confidence">{ record.analysis_result().confidence_percent() }</span>
                        <span class="history-date">{ record.created_at.format("%b %d, %H:%M").to_string() }</span>
                    </li>
                })}
            </ul>
        </div>
    }
}
