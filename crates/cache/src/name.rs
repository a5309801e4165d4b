/// Rewrites an uploaded filename into the form the registry tracks.
///
/// Every space becomes a hyphen. This happens exactly once, when an upload is
/// ingested; names are never re-checked afterwards.
///
/// ```
/// assert_eq!(reel_cache::normalize_name("clip one.mp4"), "clip-one.mp4");
/// ```
pub fn normalize(name: &str) -> String {
    name.replace(' ', "-")
}
