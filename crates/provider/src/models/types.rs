use std::borrow::Cow;

/// Provider identifier - mostly static constants ("amazon", "google", ...)
pub type ProviderId = Cow<'static, str>;
