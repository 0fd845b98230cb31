use super::super::Model;
use yew::prelude::*;

pub fn render_preview_area(model: &Model) -> Html {
    let Some(preview) = &model.preview else {
        return html! {};
    };

    html! {
        <div id="preview-container">
            <img id="actual-image-preview" src={preview.url.to_string()} alt="Leaf Preview" />
            <p class="preview-caption">
                <span class="analyzed-filename-display">{ &preview.file_name }</span>
                {" "}
                <span class="file-size">{ format!("({})", preview.size_label) }</span>
            </p>
        </div>
    }
}
