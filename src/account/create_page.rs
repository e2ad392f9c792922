//! The page for creating a new account.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

use crate::{
    account::core::AccountKind,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE,
        FORM_RADIO_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, base,
        dollar_input_styles,
    },
    navigation::NavBar,
};

fn kind_radio(kind: AccountKind, checked: bool) -> Markup {
    let id = format!("kind-{}", kind.as_str().to_lowercase());
    let label = match kind {
        AccountKind::Savings => "Savings",
        AccountKind::Current => "Current",
    };

    html!(
        div class="flex items-center gap-2"
        {
            input
                type="radio"
                name="kind"
                id=(id)
                value=(kind.as_str())
                class=(FORM_RADIO_INPUT_STYLE)
                checked[checked];

            label for=(id) class=(FORM_RADIO_LABEL_STYLE) { (label) }
        }
    )
}

fn create_account_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_ACCOUNT_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full max-w-md"
            {
                h1 class="text-xl font-bold mb-4" { "New Account" }

                form
                    class="space-y-4"
                    hx-post=(endpoints::ACCOUNTS_API)
                    hx-target-error="#alert-container"
                {
                    div
                    {
                        label for="name" class=(FORM_LABEL_STYLE) { "Name" }

                        input
                            type="text"
                            name="name"
                            id="name"
                            placeholder="e.g. Everyday spending"
                            class=(FORM_TEXT_INPUT_STYLE)
                            required;
                    }

                    fieldset class=(FORM_RADIO_GROUP_STYLE)
                    {
                        legend class=(FORM_LABEL_STYLE) { "Account type" }

                        (kind_radio(AccountKind::Current, true))
                        (kind_radio(AccountKind::Savings, false))
                    }

                    div
                    {
                        label for="balance" class=(FORM_LABEL_STYLE) { "Opening balance" }

                        div class="input-wrapper w-full"
                        {
                            input
                                type="number"
                                name="balance"
                                id="balance"
                                step="0.01"
                                class=(FORM_TEXT_INPUT_STYLE)
                                required;
                        }
                    }

                    div class="flex items-center gap-2"
                    {
                        input
                            type="checkbox"
                            name="is_default"
                            id="is_default"
                            value="true"
                            class=(FORM_RADIO_INPUT_STYLE);

                        label for="is_default" class=(FORM_LABEL_STYLE)
                        {
                            "Use as my default account"
                        }
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Account" }
                }
            }
        }
    );

    base("New Account", &[dollar_input_styles()], &content)
}

/// Renders the page for creating a new account.
pub async fn get_create_account_page() -> Response {
    create_account_view().into_response()
}
