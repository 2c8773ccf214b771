use maud::{html, Markup};

use crate::{
    db::{format_date, DateBounds},
    templates::layouts::{base, PageConfig},
};

pub fn home_page(api_base: &str, bounds: &DateBounds) -> Markup {
    let config = PageConfig {
        title: "Hawaii Climate Analysis API",
        api_base,
    };

    base(&config, content(bounds))
}

fn content(bounds: &DateBounds) -> Markup {
    let first = format_date(bounds.first);
    let last = format_date(bounds.last);

    html! {
        div class="content" {
            h2 class="subtitle" { "Available Routes" }
            ul {
                li {
                    a href="/api/v1.0/precipitation" { "/api/v1.0/precipitation" }
                    " — precipitation by date over the trailing year of the dataset"
                }
                li {
                    a href="/api/v1.0/stations" { "/api/v1.0/stations" }
                    " — all weather stations"
                }
                li {
                    a href="/api/v1.0/tobs" { "/api/v1.0/tobs" }
                    " — temperature observations for the most active station"
                }
            }

            p {
                "Temperature Option 1: enter a start date between "
                strong { (first) } " and " strong { (last) }
                " to return per-date temperature aggregates from the start date onward."
            }
            form action="/api/v1.0/temp/start" method="post" {
                div class="field is-grouped" {
                    div class="control" {
                        input class="input" type="date" name="start_date"
                              min=(first) max=(last);
                    }
                    div class="control" {
                        input class="button is-primary" type="submit" value="Submit";
                    }
                }
            }

            p {
                "Temperature Option 2: enter a start date and end date between "
                strong { (first) } " and " strong { (last) }
                " to return per-date temperature aggregates within the range."
            }
            form action="/api/v1.0/temp/start/end" method="post" {
                div class="field is-grouped" {
                    div class="control" {
                        label class="label is-small" { "Start date" }
                        input class="input" type="date" name="start_date"
                              min=(first) max=(last);
                    }
                    div class="control" {
                        label class="label is-small" { "End date" }
                        input class="input" type="date" name="end_date"
                              min=(first) max=(last);
                    }
                    div class="control" {
                        input class="button is-primary" type="submit" value="Submit";
                    }
                }
            }
        }
    }
}
