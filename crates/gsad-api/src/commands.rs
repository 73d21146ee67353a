//! Allow-listed manager commands and how request parameters become XML.

use http::Method;

use gsad_gmp::xml::escape;

use crate::error::DispatchError;
use crate::request::Params;

/// Where a parameter goes in the command element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    /// `<cmd name="value"/>`
    Attr,
    /// `<cmd><name>value</name></cmd>`
    Child,
    /// `<cmd><element id="value"/></cmd>`
    Ref(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub place: Place,
    pub required: bool,
}

const fn attr(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        place: Place::Attr,
        required: false,
    }
}

const fn required_attr(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        place: Place::Attr,
        required: true,
    }
}

const fn child(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        place: Place::Child,
        required: false,
    }
}

const fn required_child(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        place: Place::Child,
        required: true,
    }
}

const fn reference(name: &'static str, element: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        place: Place::Ref(element),
        required: true,
    }
}

/// One command the browser may issue.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    /// Value of the `cmd` parameter.
    pub name: &'static str,
    /// Method it must arrive with.
    pub post: bool,
    /// Manager element it is sent as.
    pub element: &'static str,
    pub params: &'static [ParamSpec],
}

const LIST_PARAMS: &[ParamSpec] = &[attr("filter"), attr("filt_id"), attr("first"), attr("max")];

static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "get_tasks",
        post: false,
        element: "get_tasks",
        params: &[attr("filter"), attr("filt_id"), attr("details")],
    },
    CommandSpec {
        name: "get_task",
        post: false,
        element: "get_tasks",
        params: &[required_attr("task_id"), attr("details")],
    },
    CommandSpec {
        name: "get_reports",
        post: false,
        element: "get_reports",
        params: &[attr("filter"), attr("filt_id"), attr("details")],
    },
    CommandSpec {
        name: "get_report",
        post: false,
        element: "get_reports",
        params: &[
            required_attr("report_id"),
            attr("delta_report_id"),
            attr("report_format_id"),
            attr("filter"),
            attr("details"),
            attr("ignore_pagination"),
        ],
    },
    CommandSpec {
        name: "get_results",
        post: false,
        element: "get_results",
        params: LIST_PARAMS,
    },
    CommandSpec {
        name: "get_result",
        post: false,
        element: "get_results",
        params: &[required_attr("result_id"), attr("details")],
    },
    CommandSpec {
        name: "get_targets",
        post: false,
        element: "get_targets",
        params: LIST_PARAMS,
    },
    CommandSpec {
        name: "get_target",
        post: false,
        element: "get_targets",
        params: &[required_attr("target_id")],
    },
    CommandSpec {
        name: "get_configs",
        post: false,
        element: "get_configs",
        params: LIST_PARAMS,
    },
    CommandSpec {
        name: "get_scanners",
        post: false,
        element: "get_scanners",
        params: LIST_PARAMS,
    },
    CommandSpec {
        name: "get_port_lists",
        post: false,
        element: "get_port_lists",
        params: LIST_PARAMS,
    },
    CommandSpec {
        name: "get_report_formats",
        post: false,
        element: "get_report_formats",
        params: LIST_PARAMS,
    },
    CommandSpec {
        name: "get_notes",
        post: false,
        element: "get_notes",
        params: LIST_PARAMS,
    },
    CommandSpec {
        name: "get_overrides",
        post: false,
        element: "get_overrides",
        params: LIST_PARAMS,
    },
    CommandSpec {
        name: "get_my_settings",
        post: false,
        element: "get_settings",
        params: &[],
    },
    CommandSpec {
        name: "get_system_reports",
        post: false,
        element: "get_system_reports",
        params: &[attr("duration"), attr("slave_id")],
    },
    CommandSpec {
        name: "get_version",
        post: false,
        element: "get_version",
        params: &[],
    },
    CommandSpec {
        name: "create_task",
        post: true,
        element: "create_task",
        params: &[
            required_child("name"),
            child("comment"),
            reference("config_id", "config"),
            reference("target_id", "target"),
            reference("scanner_id", "scanner"),
        ],
    },
    CommandSpec {
        name: "modify_task",
        post: true,
        element: "modify_task",
        params: &[required_attr("task_id"), child("name"), child("comment")],
    },
    CommandSpec {
        name: "delete_task",
        post: true,
        element: "delete_task",
        params: &[required_attr("task_id")],
    },
    CommandSpec {
        name: "start_task",
        post: true,
        element: "start_task",
        params: &[required_attr("task_id")],
    },
    CommandSpec {
        name: "stop_task",
        post: true,
        element: "stop_task",
        params: &[required_attr("task_id")],
    },
    CommandSpec {
        name: "resume_task",
        post: true,
        element: "resume_task",
        params: &[required_attr("task_id")],
    },
    CommandSpec {
        name: "create_target",
        post: true,
        element: "create_target",
        params: &[
            required_child("name"),
            required_child("hosts"),
            child("comment"),
            reference("port_list_id", "port_list"),
        ],
    },
    CommandSpec {
        name: "delete_target",
        post: true,
        element: "delete_target",
        params: &[required_attr("target_id")],
    },
];

/// Looks up an allow-listed command for the given method.
pub fn lookup(name: &str, method: &Method) -> Option<&'static CommandSpec> {
    let post = *method == Method::POST;
    COMMANDS.iter().find(|c| c.name == name && c.post == post)
}

/// The `cmd` parameter, if it is valid and allow-listed for this method.
pub fn resolve(params: &Params, method: &Method) -> Result<&'static CommandSpec, DispatchError> {
    let name = params
        .value("cmd")
        .ok_or_else(|| DispatchError::UnknownCommand(String::new()))?;
    lookup(name, method).ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))
}

impl CommandSpec {
    /// Builds the manager command from validated parameters.
    ///
    /// Optional parameters that are absent, empty, or invalid are left out;
    /// a missing required one is an error naming it.
    pub fn build(&self, params: &Params) -> Result<String, DispatchError> {
        let mut attrs = String::new();
        let mut children = String::new();

        for spec in self.params {
            let value = match params.non_empty(spec.name) {
                Some(value) => value,
                None if spec.required => {
                    return Err(DispatchError::InvalidParameter(spec.name.to_string()));
                }
                None => continue,
            };
            let name = spec.name;
            let value = escape(value);
            match spec.place {
                Place::Attr => attrs.push_str(&format!(" {name}=\"{value}\"")),
                Place::Child => children.push_str(&format!("<{name}>{value}</{name}>")),
                Place::Ref(element) => children.push_str(&format!("<{element} id=\"{value}\"/>")),
            }
        }

        let element = self.element;
        Ok(if children.is_empty() {
            format!("<{element}{attrs}/>")
        } else {
            format!("<{element}{attrs}>{children}</{element}>")
        })
    }
}
