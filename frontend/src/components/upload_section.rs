use super::super::{Model, Msg};
use super::utils::{category_label, debounce, extract_image_files};
use shared::PlantCategory;
use strum::IntoEnumIterator;
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    if !model.is_editable() {
        return html! {};
    }
    html! {
        <div class="upload-section">
            { render_file_input_area(model, ctx) }
            { render_category_selector(model, ctx) }
            { render_analyze_button(model, ctx) }
        </div>
    }
}

fn render_file_input_area(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let handle_change = link.batch_callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let files = input.files();
        let files_to_process = files.as_ref().map(extract_image_files).unwrap_or_default();

        input.set_value("");

        if files_to_process.is_empty() {
            log::debug!("No image among the picked files");
            None
        } else {
            Some(Msg::FilesAdded(files_to_process))
        }
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(|_| {
        let input = web_sys::window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id("file-input"));
        if let Some(input) = input {
            if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
                html_input.click();
            }
        }
    });

    html! {
        <>
            <input
                type="file"
                id="file-input"
                accept="image/*"
                style="display: none;"
                onchange={handle_change}
            />

            <div
                id="drop-zone"
                class={classes!("upload-area", model.is_dragging.then_some("drag-over"))}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                <div class="upload-placeholder">
                    <i class="fa-solid fa-cloud-arrow-up"></i>
                    <p>{"Drag & drop a leaf photo here, paste, or click"}</p>
                    <p class="file-types">{"Any image format your browser can read"}</p>
                </div>
            </div>
        </>
    }
}

fn render_category_selector(model: &Model, ctx: &Context<Model>) -> Html {
    let selected = model.category();
    let handle_change = ctx.link().callback(|e: Event| {
        let select: HtmlSelectElement = e.target_unchecked_into();
        Msg::SetCategory(PlantCategory::from_hint(&select.value()))
    });

    html! {
        <div class="plant-category-selector">
            <label for="plant-category">{"Plant type"}</label>
            <select id="plant-category" onchange={handle_change}>
                <option value="" selected={selected.is_none()}>{"Select plant type"}</option>
                { for PlantCategory::iter().map(|category| html! {
                    <option
                        value={category.as_ref().to_string()}
                        selected={selected == Some(category)}
                    >
                        { category_label(category) }
                    </option>
                })}
            </select>
        </div>
    }
}

fn render_analyze_button(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link().clone();
    let hint = if model.preview.is_none() {
        "Select an image to analyze"
    } else if model.category().is_none() {
        "Select the plant type"
    } else {
        "Run the analysis"
    };

    html! {
        <div class="button-container">
            <button
                class="analyze-btn"
                title={hint}
                disabled={!model.can_submit()}
                onclick={debounce(300, move || link.send_message(Msg::Analyze))}
            >
                <i class="fa-solid fa-magnifying-glass"></i>{" Analyze Plant"}
            </button>
        </div>
    }
}
