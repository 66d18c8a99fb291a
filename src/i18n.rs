use i18n_embed::{
    fluent::{fluent_language_loader, FluentLanguageLoader},
    DesktopLanguageRequester, LanguageLoader,
};
use lazy_static::lazy_static;
use log::warn;
use rust_embed::RustEmbed;
use unic_langid::LanguageIdentifier;

#[derive(RustEmbed)]
#[folder = "i18n"]
struct Localizations;

lazy_static! {
    pub static ref I18N_LOADER: FluentLanguageLoader = load_i18n();
}

#[macro_export]
macro_rules! fl {
    ($message_id:literal) => {{
        i18n_embed_fl::fl!($crate::i18n::I18N_LOADER, $message_id)
    }};

    ($message_id:literal, $($args:expr),*) => {{
        i18n_embed_fl::fl!($crate::i18n::I18N_LOADER, $message_id, $($args), *)
    }};
}

fn load_i18n() -> FluentLanguageLoader {
    let language_loader: FluentLanguageLoader = fluent_language_loader!();
    let requested_languages = DesktopLanguageRequester::requested_languages();
    if let Err(e) = i18n_embed::select(&language_loader, &Localizations, &requested_languages) {
        warn!("Failed to load desktop language: {}", e);
        if let Err(e) = language_loader.load_fallback_language(&Localizations) {
            warn!("Failed to load fallback language: {}", e);
        }
    }
    // output goes to a terminal, not a bidi-aware renderer
    language_loader.set_use_isolating(false);

    language_loader
}

/// Switches the message catalog to `language`, e.g. `zh-CN`.
pub fn set_language(language: &str) {
    let id: LanguageIdentifier = match language.parse() {
        Ok(id) => id,
        Err(e) => {
            warn!("Invalid language {:?}: {}", language, e);
            return;
        }
    };
    if let Err(e) = i18n_embed::select(&*I18N_LOADER, &Localizations, &[id]) {
        warn!("Failed to switch language to {}: {}", language, e);
    }
    I18N_LOADER.set_use_isolating(false);
}

// tests
#[test]
fn test_fallback_messages() {
    assert_eq!(I18N_LOADER.fallback_language().to_string(), "en-US");
    assert!(!crate::fl!("ok").is_empty());
}
