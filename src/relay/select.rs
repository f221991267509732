/// Pick one variant out of an upstream list
///
/// Keywords are tried in order; the first item whose label contains the
/// keyword (ignoring case) wins. When no label matches, the first item in
/// upstream order is returned. That order is whatever the upstream sends and
/// says nothing about quality.
///
/// # Arguments
/// * `items` - Candidates in upstream order
/// * `keywords` - Preferred label fragments, most preferred first
/// * `label` - Extracts the descriptive label of a candidate
///
/// # Returns
/// The chosen candidate, or None when the list is empty
pub fn select_preferred<'a, T, F>(items: &'a [T], keywords: &[&str], label: F) -> Option<&'a T>
where
    F: Fn(&T) -> Option<&str>,
{
    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        let found = items.iter().find(|item| {
            label(item)
                .map(|text| text.to_lowercase().contains(&keyword))
                .unwrap_or(false)
        });
        if found.is_some() {
            return found;
        }
    }

    items.first()
}
