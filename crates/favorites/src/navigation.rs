//! Sign-in redirect for signed-out favorite attempts.

/// Page navigation provided by the hosting UI.
pub trait SignInNavigator: Send + Sync {
    /// Absolute URL of the page currently shown, used as the return target.
    fn current_url(&self) -> String;

    fn navigate(&self, url: &str);
}

/// Builds `{sign_in_path}?returnUrl=..&action=favorite&listingId=..`.
pub fn sign_in_url(sign_in_path: &str, return_url: &str, listing_id: &str) -> String {
    format!(
        "{}?returnUrl={}&action=favorite&listingId={}",
        sign_in_path,
        urlencoding::encode(return_url),
        urlencoding::encode(listing_id)
    )
}
