use crate::visitor::Platform;
use url::Url;

const ANDROID_BASE: &str = "https://api.whatsapp.com/send";
const IOS_BASE: &str = "whatsapp://send";
const DESKTOP_BASE: &str = "https://web.whatsapp.com/send";
const SHARE_BASE: &str = "https://wa.me/";

/// Strips everything but digits, which is the only phone format the chat
/// links accept.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Builds the chat link for the visitor's platform.
pub fn chat_link(phone: &str, message: Option<&str>, platform: Platform) -> Result<Url, url::ParseError> {
    let base = match platform {
        Platform::Android => ANDROID_BASE,
        Platform::Ios => IOS_BASE,
        Platform::Desktop => DESKTOP_BASE,
    };

    let mut url = Url::parse(base)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("phone", &phone_digits(phone));
        if let Some(text) = message.filter(|m| !m.is_empty()) {
            query.append_pair("text", text);
        }
    }
    Ok(url)
}

/// The short `wa.me` form, served to crawlers so link previews resolve.
pub fn share_link(phone: &str, message: Option<&str>) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(SHARE_BASE)?.join(&phone_digits(phone))?;
    if let Some(text) = message.filter(|m| !m.is_empty()) {
        url.query_pairs_mut().append_pair("text", text);
    }
    Ok(url)
}
