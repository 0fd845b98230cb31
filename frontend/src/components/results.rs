use super::super::{Model, Msg};
use super::utils::category_label;
use shared::{AnalysisError, ControllerState, PredictionRecord};
use yew::prelude::*;

pub fn render_results(model: &Model, ctx: &Context<Model>) -> Html {
    if model.analyzing {
        return render_progress(model, ctx);
    }

    match model.state() {
        Some(ControllerState::Result(record)) => render_record(record, ctx),
        Some(ControllerState::Error(error)) => render_error(error, ctx),
        _ => html! {},
    }
}

fn render_progress(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <div class="results-container analyzing">
            <div class="result-header">
                <h2><i class="fa-solid fa-spinner fa-spin"></i>{" Analyzing..."}</h2>
                <div class="confidence-meter">
                    <div class="meter">
                        <div class="meter-fill" style={format!("width: {}%", model.progress)}></div>
                    </div>
                    <div class="meter-value">{ format!("{}%", model.progress) }</div>
                </div>
            </div>
            <button class="analyze-btn cancel-btn" onclick={ctx.link().callback(|_| Msg::Cancel)}>
                <i class="fa-solid fa-xmark"></i>{" Cancel"}
            </button>
        </div>
    }
}

fn render_record(record: &PredictionRecord, ctx: &Context<Model>) -> Html {
    let result = record.analysis_result();
    let healthy = result.is_healthy();

    html! {
        <div class={classes!("results-container", if healthy { "healthy" } else { "diseased" })}>
            <div class="result-header">
                <h2 title={format!("Analysis {} for {}", record.id, record.plant_category)}>
                    {
                        if healthy {
                            html! { <><i class="fa-solid fa-seedling"></i>{" Healthy"}</> }
                        } else {
                            html! { <><i class="fa-solid fa-disease"></i>{ format!(" {}", result.label) }</> }
                        }
                    }
                    <span class="analyzed-filename-display">
                        { format!("({})", category_label(record.plant_category)) }
                    </span>
                </h2>
                <div class="confidence-meter">
                    <div class="meter-label">{"Confidence:"}</div>
                    <div class="meter">
                        <div class="meter-fill" style={format!("width: {}%", result.confidence * 100.0)}></div>
                    </div>
                    <div class="meter-value">{ result.confidence_percent() }</div>
                </div>
            </div>
            if !healthy {
                <div class="disease-advisory">
                    <i class="fa-solid fa-triangle-exclamation"></i>
                    <div>
                        <h4>{"Disease Detected"}</h4>
                        <p>{"We recommend consulting our disease database for detailed treatment information."}</p>
                    </div>
                </div>
            }
            <button class="analyze-btn" onclick={ctx.link().callback(|_| Msg::Reset)}>
                <i class="fa-solid fa-rotate-left"></i>{" Analyze Another"}
            </button>
        </div>
    }
}

fn render_error(error: &AnalysisError, ctx: &Context<Model>) -> Html {
    html! {
        <div class="error-message">
            <i class="fa-solid fa-circle-exclamation"></i>
            <p>{ error.to_string() }</p>
            <button class="analyze-btn" onclick={ctx.link().callback(|_| Msg::Reset)}>
                <i class="fa-solid fa-rotate-left"></i>{" Try Again"}
            </button>
        </div>
    }
}
