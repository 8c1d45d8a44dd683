//! Assembles one page's full HTML document: head, optional top nav,
//! sidebar (scoped to the active path), optional breadcrumbs, rendered
//! content, optional previous/next links, and an optional right-hand
//! TOC shown only when the page has enough headings to be worth it.

use crate::assets::Asset;
use crate::markdown::TocEntry;
use crate::nav::NavLink;

/// Everything the page template needs, already resolved by the
/// assembler (`crate::assemble`) from the `Site`, `Config`, and the
/// page's own `PageContent`. Nav links and the css/js assets already
/// carry whatever `base_path`/hashing/inlining they need; the template
/// itself makes no such decisions.
pub struct PageContext<'a> {
    pub page_title: &'a str,
    pub site_title: &'a str,
    pub description: &'a str,
    pub og_image: Option<&'a str>,
    pub favicon: Option<&'a str>,
    pub css: &'a Asset,
    pub accent_color: Option<&'a str>,
    pub content_html: &'a str,
    pub toc: &'a [TocEntry],
    pub sidebar: &'a [NavLink],
    pub top_nav: Option<&'a [NavLink]>,
    pub breadcrumbs_html: &'a str,
    pub prev: Option<(&'a str, &'a str)>,
    pub next: Option<(&'a str, &'a str)>,
    pub base_path: &'a str,
    pub search_asset: Option<&'a Asset>,
    pub copy_button: &'a Asset,
    pub pwa_enabled: bool,
    pub reading_time_minutes: u32,
}

pub fn render(ctx: &PageContext) -> String {
    Page { ctx }.to_string()
}

markup::define! {
    Page<'a>(ctx: &'a PageContext<'a>) {
        @markup::doctype()
        html[lang="en"] {
            head {
                meta[charset="utf-8"];
                title { @ctx.page_title }
                meta[name="viewport", content="width=device-width, initial-scale=1"];
                meta[name="description", content=ctx.description];
                meta[property="og:title", content=ctx.page_title];
                meta[property="og:description", content=ctx.description];

                @if let Some(og_image) = ctx.og_image {
                    meta[property="og:image", content=og_image];
                }

                @if let Some(favicon) = ctx.favicon {
                    link[rel="icon", href=favicon];
                }

                @if let Some(href) = ctx.css.href() {
                    link[rel="stylesheet", href=href];
                }
                @if let Some(content) = ctx.css.inline() {
                    style { @markup::raw(content) }
                }

                @if let Some(accent) = ctx.accent_color {
                    style { "html{--accent:" @accent "}" }
                }

                @if ctx.pwa_enabled {
                    link[rel="manifest", href=format!("{}/manifest.json", ctx.base_path)];
                }

                @markup::raw(ctx.breadcrumbs_html)
            }

            body {
                @if let Some(top_nav) = ctx.top_nav {
                    @TopNav { links: top_nav }
                }

                div[class="layout"] {
                    nav[class="sidebar"] {
                        @if ctx.search_asset.is_some() {
                            div[class="search", id="search"] {
                                input[type="text", id="search-box", "data-base"=ctx.base_path, placeholder="Search... (Ctrl+K)", autocomplete="off"];
                                ul[id="search-results"] {}
                            }
                        }
                        ul[class="tree"] {
                            @for link in ctx.sidebar.iter() {
                                @SidebarLink { link: link }
                            }
                        }
                    }

                    main[class="content"] {
                        @if !ctx.breadcrumbs_html.is_empty() {
                            @markup::raw(&strip_json_ld(ctx.breadcrumbs_html))
                        }

                        article {
                            @markup::raw(ctx.content_html)
                        }

                        @if ctx.reading_time_minutes > 0 {
                            p[class="reading-time"] {
                                {format!("{} min read", ctx.reading_time_minutes)}
                            }
                        }

                        @if ctx.prev.is_some() || ctx.next.is_some() {
                            nav[class="page-nav-links"] {
                                @if let Some((title, url)) = ctx.prev {
                                    a[class="prev", href=url] { "← " @title }
                                }
                                @if let Some((title, url)) = ctx.next {
                                    a[class="next", href=url] { @title " →" }
                                }
                            }
                        }
                    }

                    @if ctx.toc.len() >= 3 {
                        nav[class="page-nav"] {
                            p[class="page-nav-header"] { "On this page" }
                            ul {
                                @for heading in ctx.toc.iter() {
                                    li[class=format!("page-nav-level-{}", heading.level)] {
                                        a[href=format!("#{}", heading.anchor)] { {&heading.text} }
                                    }
                                }
                            }
                        }
                    }
                }

                @if let Some(asset) = ctx.search_asset {
                    @if let Some(href) = asset.href() {
                        script[src=href, defer=""] {}
                    }
                    @if let Some(content) = asset.inline() {
                        script { @markup::raw(content) }
                    }
                }
                @if let Some(href) = ctx.copy_button.href() {
                    script[src=href, defer=""] {}
                }
                @if let Some(content) = ctx.copy_button.inline() {
                    script { @markup::raw(content) }
                }
            }
        }
    }

    TopNav<'a>(links: &'a [NavLink]) {
        nav[class="top-nav"] {
            ul {
                @for link in links.iter() {
                    li[class=if link.active { "active" } else { "" }] {
                        a[href=&link.url] { {&link.title} }
                    }
                }
            }
        }
    }

    SidebarLink<'a>(link: &'a NavLink) {
        @if link.is_folder {
            li[class=if link.on_path { "on-path" } else { "" }] {
                details[open=link.on_path] {
                    summary {
                        a[href=&link.url] { {&link.title} }
                    }
                    ul {
                        @for child in link.children.iter() {
                            @SidebarLink { link: child }
                        }
                    }
                }
            }
        } else {
            li[class=if link.active { "active" } else { "" }] {
                a[href=&link.url] { {&link.title} }
            }
        }
    }
}

/// The breadcrumbs helper emits a `<script type="application/ld+json">`
/// tag meant for `<head>` followed by the visible `<nav>`; this strips
/// the script back out for the body placement.
fn strip_json_ld(breadcrumbs_html: &str) -> String {
    match breadcrumbs_html.find("<nav") {
        Some(idx) => breadcrumbs_html[idx..].to_string(),
        None => String::new(),
    }
}
