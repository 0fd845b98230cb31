use super::super::Model;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use shared::PlantCategory;
use shared::model::is_image_media_type;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::FileList;
use yew::prelude::*;

// Debounce function to limit button events
pub fn debounce<F>(duration: i32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));
    let timeout_clone = Rc::clone(&timeout);

    Callback::from(move |_| {
        let mut timeout_ref = timeout_clone.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        let new_timeout = Timeout::new(duration as u32, move || {
            inner_callback();
        });

        *timeout_ref = Some(new_timeout);
    })
}

pub fn extract_image_files(file_list: &FileList) -> Vec<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .filter(|file| {
            let accepted = is_image_media_type(&file.type_());
            if !accepted {
                log::warn!("Skipping non-image file: {}", file.name());
            }
            accepted
        })
        .map(GlooFile::from)
        .collect()
}

pub fn render_notice(model: &Model) -> Html {
    if let Some(notice) = &model.notice {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ notice }</p>
            </div>
        }
    } else {
        html! {}
    }
}

pub fn category_label(category: PlantCategory) -> String {
    let name = category.to_string();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => name,
    }
}
