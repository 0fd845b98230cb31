use super::super::Model;
use shared::model::format_percent;
use yew::prelude::*;

pub fn render_stats_cards(model: &Model) -> Html {
    if model.user.is_none() {
        return html! {};
    }
    let Some(stats) = &model.stats else {
        if model.refreshing {
            return html! {
                <div class="stats-cards loading">
                    <i class="fa-solid fa-spinner fa-spin"></i>{" Loading statistics..."}
                </div>
            };
        }
        return html! {};
    };

    let healthy_rate = stats
        .healthy_rate
        .map(format_percent)
        .unwrap_or_else(|| "-".to_string());

    html! {
        <div class="stats-cards">
            { render_card("fa-chart-line", "Total Analyses", stats.total_predictions.to_string()) }
            { render_card("fa-bullseye", "Model Accuracy", format_percent(stats.model_accuracy)) }
            { render_card("fa-virus", "Diseases Covered", stats.diseases_covered.to_string()) }
            { render_card("fa-seedling", "Healthy Rate", healthy_rate) }
        </div>
    }
}

fn render_card(icon: &'static str, label: &'static str, value: String) -> Html {
    html! {
        <div class="stats-card">
            <i class={classes!("fa-solid", icon)}></i>
            <div class="stats-value">{ value }</div>
            <div class="stats-label">{ label }</div>
        </div>
    }
}
