// Renders a like-check batch as VKScript for the `execute` method.
//
// The loop below mirrors `LikeCheckBatch::evaluate`; keep the two in step.

use crate::core::moderation::LikeCheckBatch;

const CHECK_LOOP: &str = r#"var calls = 0;
var unliked = [];
var unchecked = [];
var i = 0;

while (i < posts.length) {
    if (calls >= budget) {
        unchecked.push(posts[i]);
    } else {
        var page = 0;
        var inProgress = true;

        while (inProgress && calls < budget) {
            var likes = API.likes.getList({
                type: "post",
                owner_id: posts[i].owner_id,
                item_id: posts[i].item_id,
                count: pageSize,
                offset: page * pageSize,
            });
            calls = calls + 1;

            if (likes.items.indexOf(userId) != -1) {
                inProgress = false;
            } else {
                if (page * pageSize + likes.items.length >= likes.count) {
                    inProgress = false;
                    unliked.push(posts[i]);
                } else {
                    page = page + 1;
                }
            }
        }
    }

    i = i + 1;
}

return {unliked: unliked, unchecked: unchecked};"#;

pub fn render(batch: &LikeCheckBatch) -> String {
    let posts = batch
        .items
        .iter()
        .map(|item| {
            format!(
                "{{owner_id: {}, item_id: {}}}",
                item.owner_id, item.item_id
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "var posts = [{}];\nvar userId = {};\nvar budget = {};\nvar pageSize = {};\n\n{}",
        posts, batch.user_id, batch.budget, batch.page_size, CHECK_LOOP
    )
}
