//! The polling backend's lists
//!
//! Users belong to a district and an account type, create polls and respond
//! to them. A poll has an access level, a set of answers and tags; a response
//! records one user's choice of one answer.

use crate::field::{password, relationship, select, text, timestamp, SelectDisplayMode};
use crate::list::ListDecl;

/// All lists, in declaration order
pub fn lists() -> Vec<ListDecl> {
    vec![
        user(),
        district(),
        account_type(),
        poll(),
        poll_access(),
        answer(),
        response(),
        tag(),
    ]
}

fn user() -> ListDecl {
    ListDecl::new("User")
        .field("firstName", text().required())
        .field("lastName", text().required())
        .field("birthDate", timestamp())
        .field("email", text().required().unique().filterable())
        .field("password", password().required())
        .field("district", relationship("District.users"))
        .field("accountType", relationship("AccountType.users"))
        .field("polls", relationship("Poll.createdBy").many())
        .field("responses", relationship("Response.user").many())
        .label_field("firstName")
        .initial_columns(&["firstName", "lastName", "district"])
}

fn district() -> ListDecl {
    ListDecl::new("District")
        .field("name", text().required())
        .field(
            "users",
            relationship("User.district")
                .many()
                .cards(&["firstName", "lastName"])
                .link_to_item(),
        )
        .label_field("name")
        .initial_columns(&["name"])
}

fn account_type() -> ListDecl {
    ListDecl::new("AccountType")
        .field("name", text().required())
        .field(
            "users",
            relationship("User.accountType")
                .many()
                .cards(&["firstName", "lastName"])
                .link_to_item(),
        )
        .label_field("name")
}

fn poll() -> ListDecl {
    ListDecl::new("Poll")
        .field("question", text().required())
        .field("createdAt", timestamp().default_now().immutable())
        .field("createdBy", relationship("User.polls"))
        .field("access", relationship("PollAccess.polls"))
        .field("answers", relationship("Answer.poll").many())
        .field("tags", relationship("Tag.polls").many())
        .label_field("question")
        .initial_columns(&["question", "createdBy"])
}

fn poll_access() -> ListDecl {
    ListDecl::new("PollAccess")
        .field(
            "level",
            select(&[("Draft", "draft"), ("Public", "public")])
                .default_value("draft")
                .display_mode(SelectDisplayMode::SegmentedControl),
        )
        .field("polls", relationship("Poll.access").many())
        .label_field("level")
}

fn answer() -> ListDecl {
    ListDecl::new("Answer")
        .field("answer", text().required())
        .field("poll", relationship("Poll.answers"))
        .field("responses", relationship("Response.answer").many())
        .label_field("answer")
        .hidden()
}

fn response() -> ListDecl {
    ListDecl::new("Response")
        .field("answer", relationship("Answer.responses"))
        .field("user", relationship("User.responses"))
        .label_field("answer")
        .hidden()
}

fn tag() -> ListDecl {
    ListDecl::new("Tag")
        .field("name", text().required())
        .field("polls", relationship("Poll.tags").many())
}
